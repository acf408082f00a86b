use axum::{extract::FromRequestParts, http::request::Parts};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::AppError;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Whatever the client sent in `X-Admin-Key`, if anything.
///
/// Extraction never fails so read-only handlers can ignore it; mutating
/// handlers call [`AdminKey::require`] before reading the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminKey {
    Missing,
    /// Present but not representable as visible ASCII.
    Malformed,
    Provided(String),
}

impl AdminKey {
    pub fn from_header(value: Option<&axum::http::HeaderValue>) -> Self {
        match value {
            None => AdminKey::Missing,
            Some(v) => match v.to_str() {
                Ok(s) => AdminKey::Provided(s.to_owned()),
                Err(_) => AdminKey::Malformed,
            },
        }
    }

    /// Fails unless the presented key equals `expected` exactly.
    pub fn require(&self, expected: &str) -> Result<(), AppError> {
        match self {
            AdminKey::Provided(key) if keys_match(key, expected) => Ok(()),
            AdminKey::Missing => {
                warn!("Rejected mutating request without admin key");
                Err(AppError::AdminKeyMissing)
            }
            AdminKey::Provided(_) | AdminKey::Malformed => {
                warn!("Rejected mutating request with invalid admin key");
                Err(AppError::AdminKeyInvalid)
            }
        }
    }
}

/// Constant-time comparison of the two keys' SHA-256 digests.
fn keys_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

impl<S> FromRequestParts<S> for AdminKey
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AdminKey::from_header(parts.headers.get(ADMIN_KEY_HEADER)))
    }
}
