use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{suggestions::SuggestionError, validation::FieldError};

/// Error type returned by every handler.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Suggestion(#[from] SuggestionError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Suggestion(e) => suggestion_status(e),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn suggestion_status(e: &SuggestionError) -> StatusCode {
    match e {
        SuggestionError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        SuggestionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        SuggestionError::InvalidCredentials | SuggestionError::Parse(_) | SuggestionError::Upstream(_) => {
            StatusCode::BAD_GATEWAY
        }
        SuggestionError::UpstreamRateLimited => StatusCode::SERVICE_UNAVAILABLE,
        SuggestionError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Validation(errors) => {
                let body = json!({ "error": "Validation failed", "errors": errors });
                (status, Json(body)).into_response()
            }
            Self::Suggestion(e) => {
                warn!(error = %e, %status, "suggestion request failed");
                let retry_after = match &e {
                    SuggestionError::RateLimited { wait_secs } => Some(*wait_secs),
                    _ => None,
                };
                let mut res = (status, Json(json!({ "error": e.to_string() }))).into_response();
                if let Some(secs) = retry_after {
                    res.headers_mut()
                        .insert(RETRY_AFTER, HeaderValue::from(secs));
                }
                res
            }
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                (status, Json(json!({ "error": format!("{e:#}") }))).into_response()
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}
