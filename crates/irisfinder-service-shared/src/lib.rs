//! Shared HTTP infrastructure for the irisfinder service.
//!
//! This crate provides the glue between axum and `irisfinder-lib`:
//!
//! - [`AppState`]: the injected [`irisfinder_lib::IrisStore`] handle
//! - [`ServiceConfig`]: listen port, request limits and database settings
//! - [`ErrorResponse`]: the `{ "error": ... }` envelope for 4xx/5xx responses
//! - [`FindIrisResponse`]: the paginated success envelope
//! - [`metrics`]: Prometheus metrics infrastructure
//! - [`logging`]: Structured JSON logging setup
//! - [`middleware`]: Request id propagation and HTTP metrics
//! - Request schema with validation for `POST /find-iris`
//!
//! # Architecture
//!
//! The service follows a thin-handler pattern where the query lives in
//! `irisfinder-lib`. This crate provides only HTTP glue:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum Handler                                               │
//! │  - Parse request JSON                                       │
//! │  - Validate into SearchCriteria                             │
//! │  - Call IrisStore::find_within                              │
//! │  - Format response                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides fixture stores for handler testing.
//! Enable the `test-utils` feature to access it from dependent crates.

#![deny(warnings)]

mod config;
mod error_response;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod request;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ServiceConfig, DEFAULT_MAX_LIMIT, DEFAULT_PORT};
pub use error_response::{ErrorResponse, INVALID_REQUEST_MESSAGE, SEARCH_FAILED_MESSAGE};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, record_search_completed, record_search_failed, MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, RequestId, RequestTrackingLayer};
pub use request::{FindIrisRequest, NumericInput, Validate};
pub use response::FindIrisResponse;
pub use state::AppState;
