use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    contacts::{
        birthday::BirthdayWindow,
        dto::{BirthdayParams, ContactCreate, ContactPatch, ListQuery},
        repo::Contact,
    },
    error::ApiError,
    state::AppState,
};

pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/contacts", post(create_contact).get(list_contacts))
        .route("/contacts/birthdays", get(upcoming_birthdays))
        .route(
            "/contacts/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

#[instrument(skip(state, user, body), fields(user_id = %user.0.id))]
pub async fn create_contact(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<ContactCreate>,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    let contact = Contact::create(&state.db, user.0.id, &body).await?;
    info!(contact_id = %contact.id, "contact created");
    Ok((StatusCode::CREATED, Json(contact)))
}

#[instrument(skip(state, user, q), fields(user_id = %user.0.id))]
pub async fn list_contacts(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Contact>>, ApiError> {
    let contacts = Contact::list(&state.db, user.0.id, &q).await?;
    Ok(Json(contacts))
}

#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn get_contact(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Contact>, ApiError> {
    let contact = Contact::get(&state.db, user.0.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("contact not found".into()))?;
    Ok(Json(contact))
}

#[instrument(skip(state, user, patch), fields(user_id = %user.0.id))]
pub async fn update_contact(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<ContactPatch>,
) -> Result<Json<Contact>, ApiError> {
    let contact = Contact::update(&state.db, user.0.id, id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("contact not found".into()))?;
    info!(contact_id = %contact.id, "contact updated");
    Ok(Json(contact))
}

#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn delete_contact(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Contact>, ApiError> {
    let contact = Contact::delete(&state.db, user.0.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("contact not found".into()))?;
    info!(contact_id = %contact.id, "contact deleted");
    Ok(Json(contact))
}

#[instrument(skip(state, user, params), fields(user_id = %user.0.id))]
pub async fn upcoming_birthdays(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<BirthdayParams>,
) -> Result<Json<Vec<Contact>>, ApiError> {
    let window = BirthdayWindow::upcoming(params.days);
    let contacts = Contact::upcoming_birthdays(&state.db, user.0.id, &window).await?;
    Ok(Json(contacts))
}
