use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Error surfaced by an HTTP handler.  Each variant maps onto one status code, so callers can tell
/// "fix your input" (4xx) apart from "try again later" (5xx).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    Vendor { message: String, retryable: bool },
    #[error("{0}")]
    Persistence(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Vendor { .. } => "vendor",
            AppError::Persistence(_) => "persistence",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Vendor { .. } => StatusCode::BAD_GATEWAY,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Vendor { message, retryable } => json!({
                "error": message,
                "kind": self.kind(),
                "retryable": retryable,
            }),
            other => json!({
                "error": other.to_string(),
                "kind": other.kind(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

/// Failure of the backing store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Persistence(e.to_string())
    }
}

/// Failure talking to the voice-agent vendor.
#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    #[error("vendor request timed out")]
    Timeout,
    #[error("vendor transport error: {0}")]
    Transport(String),
    #[error("vendor returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("vendor response could not be decoded: {0}")]
    Decode(String),
}

impl VendorError {
    /// Timeouts, connection failures, and vendor-side 5xx are worth retrying later.
    pub fn is_retryable(&self) -> bool {
        match self {
            VendorError::Timeout | VendorError::Transport(_) => true,
            VendorError::Status { status, .. } => *status >= 500,
            VendorError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for VendorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            VendorError::Timeout
        } else if e.is_decode() {
            VendorError::Decode(e.to_string())
        } else {
            VendorError::Transport(e.to_string())
        }
    }
}

impl From<VendorError> for AppError {
    fn from(e: VendorError) -> Self {
        AppError::Vendor {
            retryable: e.is_retryable(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// A secondary effect failed after the primary effect succeeded.  Never changes the status code.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PartialSuccessWarning(pub String);

impl PartialSuccessWarning {
    pub fn new(context: &str, e: impl std::fmt::Display) -> Self {
        warn!(error=%e, "{context}");
        Self(format!("{context}: {e}"))
    }
}

pub fn log_store_error(context: &str, e: &StoreError) {
    error!(error=%e, "{context}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_errors_map_to_bad_gateway() {
        let e: AppError = VendorError::Status {
            status: 503,
            body: "down".to_string(),
        }
        .into();
        assert_eq!(e.status(), StatusCode::BAD_GATEWAY);
        assert!(matches!(e, AppError::Vendor { retryable: true, .. }));
    }

    #[test]
    fn client_side_vendor_rejection_is_not_retryable() {
        let e = VendorError::Status {
            status: 422,
            body: "bad prompt".to_string(),
        };
        assert!(!e.is_retryable());
        assert!(VendorError::Timeout.is_retryable());
    }

    #[test]
    fn store_errors_become_persistence_errors() {
        let e: AppError = StoreError::Unavailable("connection refused".to_string()).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.kind(), "persistence");
    }
}
