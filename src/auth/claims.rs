use serde::{Deserialize, Serialize};

/// JWT payload. Session tokens carry `sub = username`; email verification and
/// password reset tokens carry `sub = email`. One format for all three uses,
/// only the subject and TTL differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}
