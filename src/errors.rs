use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::request_id::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Standard error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "message": "Validation error: billing address is missing required fields: email, phone",
    "details": null,
    "request_id": "req-abc123xyz",
    "timestamp": "2026-08-29T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Bad Request", "Bad Gateway")
    #[schema(example = "Bad Request")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Validation error: billing address is missing required fields: email")]
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Failure taxonomy for the checkout flow.
///
/// Variants split along who can act on the failure: `ValidationError` and
/// `MissingField` are user-correctable and raised before any network call;
/// `InvalidTotal`, `MinimumAmount`, and `InvalidSignature` are fatal to the
/// attempt; the `Upstream*` variants carry the upstream status so client
/// errors pass through while upstream 5xx surfaces as 502.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid order total: {0}")]
    InvalidTotal(String),

    #[error("Order amount of {0} minor units is below the gateway minimum of {1}")]
    MinimumAmount(i64, i64),

    #[error("Payment verification failed")]
    InvalidSignature,

    #[error("Commerce system error: {message}")]
    UpstreamCommerce { status: u16, message: String },

    #[error("Payment gateway error: {message}")]
    UpstreamPayment { status: u16, message: String },

    #[error("Order status update failed: {0}")]
    UpstreamUpdate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

/// Maps an upstream HTTP status to the status we surface: client-caused
/// errors pass through, anything else (including 5xx) becomes 502.
fn upstream_status(status: u16) -> StatusCode {
    match StatusCode::from_u16(status) {
        Ok(code) if code.is_client_error() => code,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::MissingField(_) | Self::MinimumAmount(_, _) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidTotal(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::UpstreamCommerce { status, .. } | Self::UpstreamPayment { status, .. } => {
                upstream_status(*status)
            }
            Self::UpstreamUpdate(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    ///
    /// A signature mismatch is a security boundary: the client gets a generic
    /// message with no hint of what failed. Internal errors likewise return
    /// generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::InvalidSignature => {
                "Payment verification failed. Please contact support with your order id."
                    .to_string()
            }
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

/// API error type for HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        error_code: Option<String>,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::ServiceError(service_error) => (
                service_error.status_code(),
                service_error.response_message(),
            ),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
        };

        let err = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message,
            details: None,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
