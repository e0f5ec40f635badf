//! Error envelope for HTTP responses.
//!
//! Every non-2xx response carries a JSON body of the form
//! `{ "error": "<message>" }`, optionally with a `detail` string. Store
//! failures always use the fixed [`SEARCH_FAILED_MESSAGE`] and never expose
//! the underlying cause.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Message returned with every 500 response.
pub const SEARCH_FAILED_MESSAGE: &str = "Une erreur est survenue lors de la recherche des IRIS";

/// Message returned with every 400 response.
pub const INVALID_REQUEST_MESSAGE: &str = "Requête invalide";

/// JSON error body plus the HTTP status it is sent with.
///
/// # Example
///
/// ```
/// use irisfinder_service_shared::ErrorResponse;
///
/// let error = ErrorResponse::bad_request("Le champ 'latitude' est obligatoire");
/// assert_eq!(error.status, 400);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short, client-facing message.
    pub error: String,

    /// Explanation of what was wrong with the request. Never set on 5xx.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,

    /// HTTP status code; not part of the body.
    #[serde(skip, default = "default_status")]
    pub status: u16,
}

fn default_status() -> u16 {
    StatusCode::INTERNAL_SERVER_ERROR.as_u16()
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
            status: status.as_u16(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 400 with the fixed invalid-request message and a specific detail.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, INVALID_REQUEST_MESSAGE).with_detail(detail)
    }

    /// 500 with the fixed, opaque search failure message.
    pub fn search_failed() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SEARCH_FAILED_MESSAGE)
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.error, detail),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ErrorResponse {}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// Body that is not JSON, or JSON that does not fit the request schema.
impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
