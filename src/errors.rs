use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

/// Error taxonomy shared by every handler.
///
/// Validation and authorization failures carry a caller-facing message;
/// internal failures are logged server-side and surfaced as a generic message
/// so database details never leak to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Internal server error")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    PasswordHash(#[from] argon2::password_hash::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn admin_required() -> Self {
        Self::Forbidden("Admin access required".into())
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::PasswordHash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Database(err) => log::error!("Database error: {err:?}"),
            ApiError::PasswordHash(err) => log::error!("Password hashing error: {err:?}"),
            _ => {}
        }

        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::admin_required().status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::not_found("Business not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::validation("Rating must be between 1 and 5").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Database(sqlx::Error::PoolClosed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_their_detail() {
        let err = ApiError::Database(sqlx::Error::PoolClosed);
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn validation_errors_keep_their_message() {
        let err = ApiError::validation("Business ID and action are required");
        assert_eq!(err.to_string(), "Business ID and action are required");
    }
}
