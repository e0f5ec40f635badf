//! Success envelope for `POST /find-iris`.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use irisfinder_lib::{IrisZone, SearchCriteria, SearchPage};

/// Paginated search result returned with HTTP 200.
///
/// # Example
///
/// ```
/// use irisfinder_lib::{SearchCriteria, SearchPage};
/// use irisfinder_service_shared::FindIrisResponse;
///
/// let criteria = SearchCriteria::new(48.8566, 2.3522, 1.0);
/// let response = FindIrisResponse::new(&criteria, SearchPage::empty());
/// assert_eq!(response.total, 0);
/// assert!(response.results.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindIrisResponse {
    /// Page echoed from the request (1-based).
    pub page: u32,
    /// Page size echoed from the request.
    pub limit: u32,
    /// Number of zones in the whole candidate set.
    pub total: i64,
    /// Zones on this page; empty when nothing matched.
    #[serde(default)]
    pub results: Vec<IrisZone>,
}

impl FindIrisResponse {
    pub fn new(criteria: &SearchCriteria, page: SearchPage) -> Self {
        Self {
            page: criteria.page,
            limit: criteria.limit,
            total: page.total,
            results: page.results,
        }
    }
}

impl IntoResponse for FindIrisResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
