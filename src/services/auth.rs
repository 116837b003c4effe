//! Staff login: password digests and the HS256 tokens handed out by `/login`.

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration as StdDuration;
use thiserror::Error;

use crate::{
    config::JwtConfig,
    models::Staff,
    store::{StoreError, TicketStore},
};

pub const ISSUER: &str = "FdP Server";

/// Base64 of the SHA-256 digest, the format stored in `fdp_staff.password`.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    general_purpose::STANDARD.encode(digest)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub is_admin: bool,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("required authorization token not found")]
    MissingToken,
    #[error("authorization token is not valid")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("wrong username or password")]
    BadCredentials,
    #[error("current user can not perform administrator actions")]
    NotAdmin,
    #[error("impossible to sign the authorization token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("impossible to verify credentials: {0}")]
    Store(#[from] StoreError),
}

/// Looks the staff member up and checks the password digest.
pub async fn authenticate(
    store: &dyn TicketStore,
    deadline: StdDuration,
    username: &str,
    password: &str,
) -> Result<Staff, AuthError> {
    let staff = tokio::time::timeout(deadline, store.staff(username))
        .await
        .map_err(|_| StoreError::Timeout(deadline))??;

    match staff {
        Some(staff) if staff.verify_password(password) => Ok(staff),
        Some(_) => {
            tracing::warn!("User {} wrong login", username);
            Err(AuthError::BadCredentials)
        }
        None => {
            tracing::warn!("User {} undefined", username);
            Err(AuthError::BadCredentials)
        }
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret, Duration::minutes(config.expires_in_minutes))
    }

    pub fn issue(&self, username: &str, is_admin: bool) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            is_admin,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_digest_is_stable_base64() {
        let digest = hash_password("fdp17");
        assert_eq!(digest, hash_password("fdp17"));
        assert_ne!(digest, hash_password("fdp18"));
        // 32 bytes of digest encode to 44 base64 chars
        assert_eq!(digest.len(), 44);
    }

    #[tokio::test]
    async fn authenticate_checks_the_digest() {
        let store = crate::store::MemoryTicketStore::new();
        store.put_staff("fdp17", "door-pass", false);
        let deadline = StdDuration::from_secs(1);

        let staff = authenticate(&store, deadline, "fdp17", "door-pass").await.unwrap();
        assert!(!staff.admin);

        let wrong = authenticate(&store, deadline, "fdp17", "nope").await;
        assert!(matches!(wrong, Err(AuthError::BadCredentials)));
        let unknown = authenticate(&store, deadline, "hello", "door-pass").await;
        assert!(matches!(unknown, Err(AuthError::BadCredentials)));
    }

    #[test]
    fn issued_token_round_trips() {
        let keys = JwtKeys::new("s3cret", Duration::minutes(30));
        let token = keys.issue("adm", true).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "adm");
        assert!(claims.is_admin);
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = JwtKeys::new("one", Duration::minutes(30))
            .issue("fdp17", false)
            .unwrap();
        let err = JwtKeys::new("two", Duration::minutes(30)).verify(&token);
        assert!(matches!(err, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = JwtKeys::new("s3cret", Duration::minutes(-30));
        let token = keys.issue("fdp17", false).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken(_))));
    }
}
