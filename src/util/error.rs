use axum::{http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;

use crate::config::app_conf::production_mode;

#[derive(Debug, Serialize)]
pub enum HandlerErrorKind {
    NotFound,
    Validation,
    Internal,
    Conflict,
    BadRequest,
    RateLimited,
    UpstreamUnavailable,
}

impl std::fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandlerErrorKind::NotFound => "NotFound",
            HandlerErrorKind::Validation => "Validation",
            HandlerErrorKind::Internal => "Internal",
            HandlerErrorKind::Conflict => "Conflict",
            HandlerErrorKind::BadRequest => "BadRequest",
            HandlerErrorKind::RateLimited => "RateLimited",
            HandlerErrorKind::UpstreamUnavailable => "UpstreamUnavailable",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Serialize)]
pub struct HandlerError {
    pub error: HandlerErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl HandlerError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        HandlerError {
            error: HandlerErrorKind::BadRequest,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        HandlerError {
            error: HandlerErrorKind::Validation,
            message: message.into(),
            details: None,
        }
    }

    /// Internal error with a generic user-facing message; the diagnostic
    /// payload is only exposed outside production.
    pub fn internal(message: impl Into<String>, details: impl std::fmt::Display) -> Self {
        HandlerError {
            error: HandlerErrorKind::Internal,
            message: message.into(),
            details: if production_mode() { None } else { Some(details.to_string()) },
        }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for HandlerError {}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match self.error {
            HandlerErrorKind::NotFound => StatusCode::NOT_FOUND,
            HandlerErrorKind::Validation | HandlerErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            HandlerErrorKind::Conflict => StatusCode::CONFLICT,
            HandlerErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            HandlerErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            HandlerErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = axum::Json(self);
        (status, body).into_response()
    }
}

#[derive(Debug, Clone)]
pub enum ServiceError {
    NotFound(String),
    InvalidInput(String),
    InternalError(String),
    Conflict(String),
    RateLimited(String),
    Upstream(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ServiceError::InvalidInput(msg) => write!(f, "Invalid Input: {}", msg),
            ServiceError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServiceError::RateLimited(msg) => write!(f, "Rate Limited: {}", msg),
            ServiceError::Upstream(msg) => write!(f, "Upstream: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => HandlerError {
                error: HandlerErrorKind::NotFound,
                message: msg,
                details: None,
            },
            ServiceError::InvalidInput(msg) => HandlerError {
                error: HandlerErrorKind::Validation,
                message: msg,
                details: None,
            },
            ServiceError::Conflict(msg) => HandlerError {
                error: HandlerErrorKind::Conflict,
                message: msg,
                details: None,
            },
            ServiceError::RateLimited(msg) => HandlerError {
                error: HandlerErrorKind::RateLimited,
                message: msg,
                details: None,
            },
            ServiceError::Upstream(msg) => HandlerError {
                error: HandlerErrorKind::UpstreamUnavailable,
                message: "The service is temporarily unavailable, please try again later".to_string(),
                details: if production_mode() { None } else { Some(msg) },
            },
            ServiceError::InternalError(msg) => HandlerError::internal(
                "Something went wrong processing the request",
                msg,
            ),
        }
    }
}
