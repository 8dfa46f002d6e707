use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, CurrentUser},
    error::ApiError,
    state::AppState,
    storage::avatar_key,
    users::{
        dto::{RoleChange, UserProfile},
        repo::User,
    },
};

const AVATAR_URL_TTL_SECS: u64 = 3600;
const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(me))
        .route(
            "/users/avatar",
            patch(update_avatar).layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES)),
        )
        .route("/users/:id/role", patch(change_role))
}

async fn profile_of(state: &AppState, user: User) -> Result<UserProfile, ApiError> {
    let avatar_url = match &user.avatar {
        Some(key) => Some(state.storage.presign_get(key, AVATAR_URL_TTL_SECS).await?),
        None => None,
    };
    Ok(UserProfile {
        id: user.id,
        username: user.username,
        email: user.email,
        verified: user.verified,
        role: user.role,
        avatar_url,
    })
}

#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserProfile>, ApiError> {
    // the snapshot has no avatar key; one point lookup fills in the rest
    let user = User::find_by_id(&state.db, user.0.id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("unknown user".into()))?;
    Ok(Json(profile_of(&state, user).await?))
}

#[instrument(skip(state, admin, mp), fields(user_id = %admin.0.id))]
pub async fn update_avatar(
    State(state): State<AppState>,
    admin: AdminUser,
    mp: Multipart,
) -> Result<Json<UserProfile>, ApiError> {
    let (data, content_type) = read_avatar_field(mp).await?;

    let previous = User::find_by_id(&state.db, admin.0.id)
        .await?
        .and_then(|u| u.avatar);

    let key = avatar_key(&admin.0.username, &content_type);
    state.storage.put(&key, data, &content_type).await?;

    let user = User::set_avatar(&state.db, admin.0.id, &key)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    // old object is orphaned once the row points elsewhere
    if let Some(old) = previous {
        if let Err(e) = state.storage.delete(&old).await {
            warn!(error = %e, %old, "could not delete previous avatar");
        }
    }

    info!(user_id = %user.id, %key, "avatar updated");
    Ok(Json(profile_of(&state, user).await?))
}

/// Pull the `file` field out of a multipart upload. A malformed body is a
/// client error, not something to skip over silently.
async fn read_avatar_field(mut mp: Multipart) -> Result<(bytes::Bytes, String), ApiError> {
    loop {
        let field = match mp.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ApiError::Validation("file field is required".into())),
            Err(e) => return Err(ApiError::Validation(e.to_string())),
        };
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        if data.is_empty() {
            return Err(ApiError::Validation("file must not be empty".into()));
        }
        return Ok((data, content_type));
    }
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.0.id))]
pub async fn change_role(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleChange>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = User::set_role(&state.db, &state.cache, id, body.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    info!(user_id = %user.id, role = ?user.role, "role changed");
    Ok(Json(profile_of(&state, user).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::FromRequest, http::Request};

    async fn multipart(body: &str) -> Multipart {
        let req = Request::builder()
            .header("content-type", "multipart/form-data; boundary=XYZ")
            .body(Body::from(body.to_string()))
            .unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }

    #[tokio::test]
    async fn avatar_field_is_extracted_with_its_content_type() {
        let mp = multipart(concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n",
            "Content-Type: image/png\r\n",
            "\r\n",
            "PNGDATA\r\n",
            "--XYZ--\r\n",
        ))
        .await;
        let (data, content_type) = read_avatar_field(mp).await.expect("file field");
        assert_eq!(&data[..], b"PNGDATA");
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn unrelated_fields_are_skipped() {
        let mp = multipart(concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"comment\"\r\n",
            "\r\n",
            "not the upload\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"a.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n",
            "\r\n",
            "JPGDATA\r\n",
            "--XYZ--\r\n",
        ))
        .await;
        let (data, content_type) = read_avatar_field(mp).await.expect("file field");
        assert_eq!(&data[..], b"JPGDATA");
        assert_eq!(content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn missing_file_field_is_a_validation_error() {
        let mp = multipart(concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"comment\"\r\n",
            "\r\n",
            "no upload here\r\n",
            "--XYZ--\r\n",
        ))
        .await;
        let err = read_avatar_field(mp).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_upload_is_a_validation_error() {
        let mp = multipart(concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n",
            "Content-Type: image/png\r\n",
            "\r\n",
            "\r\n",
            "--XYZ--\r\n",
        ))
        .await;
        let err = read_avatar_field(mp).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn truncated_body_surfaces_a_validation_error() {
        // no terminating boundary; the read error must reach the caller
        let mp = multipart(concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n",
            "Content-Type: image/png\r\n",
            "\r\n",
            "PNGDA",
        ))
        .await;
        let err = read_avatar_field(mp).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
