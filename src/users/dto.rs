use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo::UserRole;

/// Profile returned by `/users/me` and after avatar/role updates.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub verified: bool,
    pub role: UserRole,
    pub avatar_url: Option<String>,
}

/// Request body for the admin role-change endpoint.
#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_serialization() {
        let profile = UserProfile {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            verified: true,
            role: UserRole::Admin,
            avatar_url: Some("https://fake.local/avatars/alice/x.png".into()),
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"role\":\"admin\""));
        assert!(json.contains("avatar_url"));
    }

    #[test]
    fn role_change_parses() {
        let body: RoleChange = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert_eq!(body.role, UserRole::Admin);
    }
}
