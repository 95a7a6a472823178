use std::fmt::Display;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::{error, warn};
use zeroclick_core::errors::{ApplicationError, InterfaceError};

/// Body of every failed response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    pub fn new(error: impl Into<ApplicationError>, correlation_id: &str) -> Self {
        let interface = error.into().into_interface(correlation_id);
        match &interface {
            InterfaceError::NotFound { message, .. } => warn!(
                event_name = "http.request.not_found",
                correlation_id,
                detail = %message,
                "requested record does not exist"
            ),
            InterfaceError::Internal { message, .. } => error!(
                event_name = "http.request.failed",
                correlation_id,
                detail = %message,
                "request failed"
            ),
        }
        Self(interface)
    }

    pub fn not_found(message: impl Into<String>, correlation_id: &str) -> Self {
        Self::new(ApplicationError::NotFound(message.into()), correlation_id)
    }

    pub fn persistence(error: impl Display, correlation_id: &str) -> Self {
        Self::new(ApplicationError::Persistence(error.to_string()), correlation_id)
    }

    pub fn integration(error: impl Display, correlation_id: &str) -> Self {
        Self::new(ApplicationError::Integration(error.to_string()), correlation_id)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody { detail: self.0.detail().to_string() })).into_response()
    }
}
