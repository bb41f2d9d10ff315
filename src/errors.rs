use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(e) => match e {
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                DomainError::InvalidOrderTotal { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::InsufficientStock { .. } => StatusCode::CONFLICT,
                DomainError::InvalidTransition { .. } => StatusCode::CONFLICT,
                DomainError::Unauthorized(_) => StatusCode::FORBIDDEN,
                DomainError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Backend details stay out of responses for infrastructure failures.
        let message = match self {
            AppError::Domain(DomainError::Unavailable(_)) => {
                "Service temporarily unavailable".to_string()
            }
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

const MAX_RETRIES: u32 = 3;

/// Run a fallible operation, retrying transient `Unavailable` failures up
/// to three attempts in total. Every other error returns immediately.
pub fn with_retries<T, F>(mut op: F) -> Result<T, DomainError>
where
    F: FnMut() -> Result<T, DomainError>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Err(DomainError::Unavailable(msg)) if attempt < MAX_RETRIES => {
                log::warn!("transient failure (attempt {attempt}/{MAX_RETRIES}): {msg}");
                attempt += 1;
            }
            other => return other,
        }
    }
}
