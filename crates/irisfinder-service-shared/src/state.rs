//! Application state for the HTTP service.
//!
//! The state owns the injected [`IrisStore`] handle and the request limits.
//! It is built once at start-up and handed to the router; no handler reaches
//! for process-global resources.

use std::sync::Arc;

use irisfinder_lib::IrisStore;

use crate::config::DEFAULT_MAX_LIMIT;

/// Shared application state for all axum handlers.
///
/// This struct is cheaply cloneable (using `Arc` internally) and should be
/// shared via axum's `State` extractor.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use axum::{Router, routing::post, extract::State};
/// use irisfinder_lib::{DatabaseConfig, PgIrisStore};
/// use irisfinder_service_shared::AppState;
///
/// async fn handler(State(state): State<AppState>) {
///     let store = state.store();
///     // ... query the store
/// }
///
/// let store = PgIrisStore::connect(&DatabaseConfig::from_env()?)?;
/// let app = Router::new()
///     .route("/find-iris", post(handler))
///     .with_state(AppState::new(Arc::new(store)));
/// ```
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn IrisStore>,
    max_limit: u32,
}

impl AppState {
    /// State with the default page size cap.
    pub fn new(store: Arc<dyn IrisStore>) -> Self {
        Self::with_max_limit(store, DEFAULT_MAX_LIMIT)
    }

    pub fn with_max_limit(store: Arc<dyn IrisStore>, max_limit: u32) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store, max_limit }),
        }
    }

    /// Access the zone store.
    pub fn store(&self) -> &dyn IrisStore {
        self.inner.store.as_ref()
    }

    /// Largest `limit` a request may ask for.
    pub fn max_limit(&self) -> u32 {
        self.inner.max_limit
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("max_limit", &self.inner.max_limit)
            .finish_non_exhaustive()
    }
}
