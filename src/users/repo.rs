use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cache::{user_key, Cache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub verified: bool,
    pub role: UserRole,
    pub avatar: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Public projection of a user, cached under `user:<username>`.
/// Must never carry the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub verified: bool,
    pub role: UserRole,
}

impl From<&User> for UserSnapshot {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            verified: user.verified,
            role: user.role,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, verified, role, avatar, created_at, updated_at";

impl User {
    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Flip the verified flag. Drops the cached snapshot so the change is
    /// visible immediately, not after the TTL runs out.
    pub async fn mark_verified(
        db: &PgPool,
        cache: &Cache,
        email: &str,
    ) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET verified = true, updated_at = now()
             WHERE email = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        if let Some(user) = &user {
            cache.delete(&user_key(&user.username)).await;
        }
        Ok(user)
    }

    /// Replace the password hash. Drops the cached snapshot.
    pub async fn set_password(
        db: &PgPool,
        cache: &Cache,
        id: Uuid,
        password_hash: &str,
    ) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET password_hash = $2, updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(password_hash)
        .fetch_optional(db)
        .await?;
        if let Some(user) = &user {
            cache.delete(&user_key(&user.username)).await;
        }
        Ok(user)
    }

    /// Change the role. Drops the cached snapshot; the role gate reads it.
    pub async fn set_role(
        db: &PgPool,
        cache: &Cache,
        id: Uuid,
        role: UserRole,
    ) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(db)
        .await?;
        if let Some(user) = &user {
            cache.delete(&user_key(&user.username)).await;
        }
        Ok(user)
    }

    /// Store a new avatar object key. The snapshot does not carry the avatar,
    /// so no cache invalidation is needed here.
    pub async fn set_avatar(db: &PgPool, id: Uuid, key: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET avatar = $2, updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(key)
        .fetch_optional(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            verified: true,
            role: UserRole::User,
            avatar: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn snapshot_mirrors_public_fields() {
        let user = sample_user();
        let snapshot = UserSnapshot::from(&user);
        assert_eq!(snapshot.id, user.id);
        assert_eq!(snapshot.username, user.username);
        assert_eq!(snapshot.email, user.email);
        assert_eq!(snapshot.verified, user.verified);
        assert_eq!(snapshot.role, user.role);
    }

    #[test]
    fn snapshot_never_serializes_password_hash() {
        let snapshot = UserSnapshot::from(&sample_user());
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn user_serialization_skips_password_hash() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&UserRole::User).unwrap(), "\"user\"");
    }
}
