use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{auth::AuthError, media::MediaError, repository::RepoError};

/// Field name -> human-readable message, rendered next to the offending control.
pub type FieldErrors = BTreeMap<String, String>;

/// AppError
///
/// The HTTP-boundary error taxonomy. Validation errors never reach the remote layer;
/// remote errors are converted into a visible message; nothing here panics the request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Deletion must be confirmed")]
    ConfirmationRequired,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("The database operation failed, please try again")]
    Repository(#[from] RepoError),
}

impl AppError {
    /// A validation error carrying a single field message.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), message.clone());
        AppError::Validation { message, fields }
    }

    /// A validation error for a set of field messages, or `Ok` if the set is empty.
    pub fn check(fields: FieldErrors) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        Err(AppError::Validation {
            message: "Some fields are missing or invalid".to_string(),
            fields,
        })
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            AppError::ConfirmationRequired => {
                (StatusCode::PRECONDITION_REQUIRED, "CONFIRMATION_REQUIRED")
            }
            AppError::Media(e) if e.is_validation() => (StatusCode::BAD_REQUEST, "INVALID_MEDIA"),
            AppError::Media(MediaError::NotConfigured) => {
                (StatusCode::SERVICE_UNAVAILABLE, "CDN_NOT_CONFIGURED")
            }
            AppError::Media(_) => (StatusCode::BAD_GATEWAY, "UPLOAD_FAILED"),
            AppError::Auth(AuthError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
            }
            AppError::Auth(AuthError::InvalidToken) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Auth(AuthError::NotConfigured(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "AUTH_NOT_CONFIGURED")
            }
            AppError::Auth(_) => (StatusCode::BAD_GATEWAY, "AUTH_PROVIDER_ERROR"),
            AppError::Repository(_) => (StatusCode::BAD_GATEWAY, "DATABASE_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        match &self {
            AppError::Repository(e) => tracing::error!(error = ?e, "repository operation failed"),
            AppError::Media(e) if !e.is_validation() => {
                tracing::error!(error = %e, "media upload failed")
            }
            AppError::Auth(e) if status != StatusCode::UNAUTHORIZED => {
                tracing::error!(error = %e, "auth provider call failed")
            }
            _ => {}
        }

        let fields = match &self {
            AppError::Validation { fields, .. } => fields.clone(),
            _ => FieldErrors::new(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
                "fields": fields,
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
