use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::{debug, warn};

use crate::auth::jwt::JwtKeys;
use crate::cache::user_key;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::{User, UserRole, UserSnapshot};

/// How long a resolved snapshot stays cached.
pub const SNAPSHOT_TTL: Duration = Duration::from_secs(3600);

/// Resolved identity of the caller.
///
/// Resolution order: validate the bearer token, try the cache under
/// `user:<username>`, fall back to Postgres on a miss and repopulate the
/// cache. A cache hit never touches the database; a dead cache only costs
/// the extra lookup. Repeated resolutions of the same valid token against
/// unchanged data yield the same snapshot.
#[derive(Debug)]
pub struct CurrentUser(pub UserSnapshot);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthenticated("missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthenticated("invalid auth scheme".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            ApiError::Unauthenticated(e.to_string())
        })?;

        let username = claims.sub;
        if username.is_empty() {
            return Err(ApiError::Unauthenticated("token has no subject".into()));
        }

        let key = user_key(&username);
        if let Some(snapshot) = state.cache.get::<UserSnapshot>(&key).await {
            debug!(%username, "identity resolved from cache");
            return Ok(CurrentUser(snapshot));
        }

        let user = User::find_by_username(&state.db, &username)
            .await?
            .ok_or_else(|| ApiError::Unauthenticated("unknown user".into()))?;

        let snapshot = UserSnapshot::from(&user);
        state.cache.set(&key, &snapshot, SNAPSHOT_TTL).await;
        debug!(%username, "identity resolved from store, snapshot cached");
        Ok(CurrentUser(snapshot))
    }
}

/// Role gate: admit only administrators. Pure check, composes after
/// identity resolution.
pub fn require_admin(user: &UserSnapshot) -> Result<(), ApiError> {
    if user.role != UserRole::Admin {
        return Err(ApiError::PermissionDenied);
    }
    Ok(())
}

/// Resolved identity that passed the admin role gate.
#[derive(Debug)]
pub struct AdminUser(pub UserSnapshot);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_admin(&user)?;
        Ok(AdminUser(user))
    }
}
