use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::forms::FieldErrors;

pub const USERNAME_TAKEN: &str = "that username is taken, try choose another username";
pub const EMAIL_TAKEN: &str = "email already used, try another email";

#[derive(Debug, thiserror::Error)]
pub enum BlogError {
    #[error("form validation failed")]
    Validation(FieldErrors),
    #[error("username already taken")]
    DuplicateUsername,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    AuthFailure,
    #[error("current password does not match")]
    WrongCurrentPassword,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("reset token invalid or expired")]
    TokenInvalidOrExpired,
    #[error("unsupported image format")]
    UnsupportedFormat,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BlogError {
    /// Field-level view of the error when it belongs on a re-rendered form.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            BlogError::Validation(errors) => Some(errors.clone()),
            BlogError::DuplicateUsername => Some(FieldErrors::single("username", USERNAME_TAKEN)),
            BlogError::DuplicateEmail => Some(FieldErrors::single("email", EMAIL_TAKEN)),
            BlogError::UnsupportedFormat => Some(FieldErrors::single(
                "picture",
                "File does not have an approved extension: jpg, jpeg, png",
            )),
            _ => None,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            BlogError::Validation(_)
            | BlogError::DuplicateUsername
            | BlogError::DuplicateEmail
            | BlogError::UnsupportedFormat
            | BlogError::WrongCurrentPassword => StatusCode::UNPROCESSABLE_ENTITY,
            BlogError::AuthFailure | BlogError::TokenInvalidOrExpired => StatusCode::UNAUTHORIZED,
            BlogError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BlogError::Forbidden => StatusCode::FORBIDDEN,
            BlogError::NotFound => StatusCode::NOT_FOUND,
            BlogError::Database(_) | BlogError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Some(errors) = self.field_errors() {
            return (status, Json(json!({ "status": status.as_u16(), "errors": errors })))
                .into_response();
        }

        let message = match &self {
            BlogError::Database(e) => {
                error!(error = %e, "database error");
                "Database operation failed".to_string()
            }
            BlogError::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            BlogError::Forbidden => {
                warn!("forbidden");
                self.to_string()
            }
            BlogError::NotFound => {
                info!("resource not found");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "status": status.as_u16(), "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, BlogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_surface_as_field_errors() {
        let errors = BlogError::DuplicateUsername.field_errors().unwrap();
        assert_eq!(errors.get("username"), [USERNAME_TAKEN]);
        let errors = BlogError::DuplicateEmail.field_errors().unwrap();
        assert_eq!(errors.get("email"), [EMAIL_TAKEN]);
        assert!(BlogError::Forbidden.field_errors().is_none());
    }

    #[test]
    fn status_codes() {
        assert_eq!(BlogError::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(BlogError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            BlogError::DuplicateEmail.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            BlogError::Internal(anyhow::anyhow!("boom")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
