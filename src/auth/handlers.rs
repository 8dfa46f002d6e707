use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest, RequestEmail, ResetPassword, TokenResponse},
        extractors::SNAPSHOT_TTL,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    cache::user_key,
    error::ApiError,
    state::AppState,
    users::repo::{User, UserSnapshot},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/confirmed_email/:token", get(confirmed_email))
        .route("/auth/request_email", post(request_email))
        .route("/auth/forgot_password", post(forgot_password))
        .route("/auth/reset_password/:token", post(reset_password))
}

fn spawn_verification_mail(state: &AppState, email: String, username: String) {
    let keys = JwtKeys::from_ref(state);
    let mailer = state.mailer.clone();
    let base = state.config.public_base_url.clone();
    tokio::spawn(async move {
        let token = match keys.sign_email(&email) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "could not sign verification token");
                return;
            }
        };
        let link = format!("{}/api/v1/auth/confirmed_email/{}", base, token);
        if let Err(e) = mailer.send_verification(&email, &username, &link).await {
            warn!(error = %e, %email, "verification mail failed");
        }
    });
}

fn spawn_reset_mail(state: &AppState, email: String, username: String) {
    let keys = JwtKeys::from_ref(state);
    let mailer = state.mailer.clone();
    let base = state.config.public_base_url.clone();
    tokio::spawn(async move {
        let token = match keys.sign_email(&email) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "could not sign reset token");
                return;
            }
        };
        let link = format!("{}/api/v1/auth/reset_password/{}", base, token);
        if let Err(e) = mailer.send_password_reset(&email, &username, &link).await {
            warn!(error = %e, %email, "reset mail failed");
        }
    });
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.username.is_empty() {
        return Err(ApiError::Validation("username must not be empty".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation("password too short".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "a user with this email already exists".into(),
        ));
    }
    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "a user with this username already exists".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash).await?;

    spawn_verification_mail(&state, user.email.clone(), user.username.clone());

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
            verified: user.verified,
            role: user.role,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login with unknown email");
            ApiError::Unauthenticated("invalid email or password".into())
        })?;

    if !user.verified {
        warn!(email = %payload.email, "login before email verification");
        return Err(ApiError::Unauthenticated("email is not verified".into()));
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthenticated("invalid email or password".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_session(&user.username)?;

    // prime the identity cache so the first authenticated request skips the store
    let snapshot = UserSnapshot::from(&user);
    state
        .cache
        .set(&user_key(&user.username), &snapshot, SNAPSHOT_TTL)
        .await;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
    }))
}

#[instrument(skip(state, token))]
pub async fn confirmed_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify(&token)
        .map_err(|_| ApiError::Validation("invalid email verification token".into()))?;
    let email = claims.sub;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::Validation("verification error".into()))?;

    if user.verified {
        return Ok(Json(json!({ "message": "your email is already verified" })));
    }

    User::mark_verified(&state.db, &state.cache, &email).await?;
    info!(%email, "email verified");
    Ok(Json(json!({ "message": "email successfully verified" })))
}

#[instrument(skip(state, body))]
pub async fn request_email(
    State(state): State<AppState>,
    Json(body): Json<RequestEmail>,
) -> Result<Json<Value>, ApiError> {
    let user = User::find_by_email(&state.db, &body.email).await?;

    match user {
        Some(user) if user.verified => {
            Ok(Json(json!({ "message": "your email is already verified" })))
        }
        Some(user) => {
            spawn_verification_mail(&state, user.email.clone(), user.username.clone());
            Ok(Json(
                json!({ "message": "check your email for verification instructions" }),
            ))
        }
        // same response for unknown addresses; do not leak registrations
        None => Ok(Json(
            json!({ "message": "check your email for verification instructions" }),
        )),
    }
}

#[instrument(skip(state, body))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<RequestEmail>,
) -> Result<Json<Value>, ApiError> {
    let user = User::find_by_email(&state.db, &body.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    if !user.verified {
        return Err(ApiError::Validation("email is not verified".into()));
    }

    spawn_reset_mail(&state, user.email.clone(), user.username.clone());
    info!(email = %user.email, "password reset requested");
    Ok(Json(
        json!({ "message": "check your email for password reset instructions" }),
    ))
}

#[instrument(skip(state, token, body))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<ResetPassword>,
) -> Result<Json<Value>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify(&token)
        .map_err(|_| ApiError::Validation("invalid or expired reset token".into()))?;
    let email = claims.sub;

    if body.new_password.len() < 8 {
        return Err(ApiError::Validation("password too short".into()));
    }

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    let hash = hash_password(&body.new_password)?;
    User::set_password(&state.db, &state.cache, user.id, &hash).await?;

    info!(%email, "password reset");
    Ok(Json(json!({ "message": "password successfully changed" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("a b@example.com"));
    }
}
