use serde::Serialize;
use sqlx::FromRow;

/// A member of the door staff allowed to log in.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Staff {
    pub username: String,
    /// Base64 encoded SHA-256 digest of the clear password.
    #[serde(skip_serializing)]
    pub password: String,
    pub admin: bool,
}

impl Staff {
    pub fn verify_password(&self, password: &str) -> bool {
        self.password == crate::services::auth::hash_password(password)
    }
}
