//! Password hashing and session identity resolution.
//!
//! Passwords are hashed with Argon2id and stored in PHC string format, so the
//! parameters and salt travel with the hash. Sessions are opaque UUID tokens
//! persisted server-side; handlers resolve them from the `Authorization`
//! header on each request.

use actix_web::HttpRequest;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use uuid::Uuid;

use crate::database::Database;
use crate::errors::ApiError;
use crate::models::CurrentUser;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Returns `Ok(false)` on a wrong password; other hash errors propagate.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Pull the session token out of `Authorization: Bearer <uuid>`.
///
/// A missing header yields `None`; a present but malformed one also yields
/// `None` so public endpoints treat it as an anonymous request.
pub fn session_token(req: &HttpRequest) -> Option<Uuid> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    Uuid::parse_str(token).ok()
}

/// Resolve the caller's identity, if any. Public endpoints use this to make
/// authentication optional.
pub async fn maybe_user(
    req: &HttpRequest,
    db: &Database,
) -> Result<Option<CurrentUser>, ApiError> {
    let Some(token) = session_token(req) else {
        return Ok(None);
    };
    Ok(db.find_session_user(token).await?)
}

/// Resolve the caller's identity or fail with 401.
pub async fn require_user(req: &HttpRequest, db: &Database) -> Result<CurrentUser, ApiError> {
    maybe_user(req, db).await?.ok_or(ApiError::Unauthorized)
}

/// Resolve the caller's identity and require the admin flag: 401 without a
/// session, 403 with a non-admin one.
pub async fn require_admin(req: &HttpRequest, db: &Database) -> Result<CurrentUser, ApiError> {
    let user = require_user(req, db).await?;
    if !user.is_admin {
        return Err(ApiError::admin_required());
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn session_token_requires_a_bearer_uuid() {
        let token = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_request();
        assert_eq!(session_token(&req), Some(token));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer not-a-uuid"))
            .to_http_request();
        assert_eq!(session_token(&req), None);

        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic abc"))
            .to_http_request();
        assert_eq!(session_token(&req), None);

        let req = TestRequest::default().to_http_request();
        assert_eq!(session_token(&req), None);
    }
}
