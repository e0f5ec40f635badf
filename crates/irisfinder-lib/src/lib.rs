//! irisfinder library entry points.
//!
//! This crate owns the search domain: the typed search criteria, the
//! [`IrisStore`] seam that answers "which IRIS zones lie within this geodesic
//! radius", and the PostGIS-backed implementation of that seam. HTTP services
//! should depend on the items exported here instead of talking to the database
//! directly.
//!

#![deny(warnings)]

pub mod config;
pub mod criteria;
pub mod error;
pub mod store;
pub mod tls;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use config::{DatabaseConfig, IrisSource, SqlIdentifier, TlsMode};
pub use criteria::{IrisZone, SearchCriteria, SearchPage, DEFAULT_LIMIT, DEFAULT_PAGE};
pub use error::{Error, Result};
pub use store::{build_pool, build_search_sql, IrisStore, PgIrisStore};
