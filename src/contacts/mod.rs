use crate::state::AppState;
use axum::Router;

pub mod birthday;
pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    handlers::contact_routes()
}
