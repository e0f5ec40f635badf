//! Test utilities for handler testing.
//!
//! This module provides fixture stores so handlers can be exercised without a
//! PostGIS server:
//!
//! - [`paris_store`]: a handful of zones at known distances from central Paris
//! - [`FailingIrisStore`]: a PostgreSQL store with a closed pool, so every search errors
//! - [`test_state`] / [`failing_state`]: ready-made [`AppState`]s

use std::sync::Arc;

use async_trait::async_trait;
use irisfinder_lib::memory::{LocatedZone, MemoryIrisStore};
use irisfinder_lib::{
    DatabaseConfig, IrisStore, PgIrisStore, Result, SearchCriteria, SearchPage, TlsMode,
};

use crate::state::AppState;

/// Central Paris (Hôtel de Ville), as used in the request examples.
pub const PARIS: (f64, f64) = (48.8566, 2.3522);

/// Known zone codes in the Paris fixture.
pub mod fixture_zones {
    /// At the search centre.
    pub const CENTRE: &str = "751040101";
    /// 300 m east of the centre.
    pub const EAST_300M: &str = "751040102";
    /// 800 m east of the centre.
    pub const EAST_800M: &str = "751040103";
    /// 1.5 km east of the centre.
    pub const EAST_1500M: &str = "751110101";
    /// 5 km east of the centre.
    pub const EAST_5KM: &str = "751200101";
    /// Lyon, far outside any city-scale radius.
    pub const LYON: &str = "693810101";
}

/// Point `km` kilometres due east of central Paris.
fn east_of_paris(km: f64) -> (f64, f64) {
    let (lat, lon) = PARIS;
    (lat, lon + km / (111.195 * lat.to_radians().cos()))
}

/// In-memory store holding five zones east of central Paris and one in Lyon.
///
/// Within 1 km of [`PARIS`] there are exactly three zones.
pub fn paris_store() -> MemoryIrisStore {
    let zone = |code: &str, name: &str, km: f64| {
        let (lat, lon) = east_of_paris(km);
        LocatedZone::new(code, name, lat, lon)
    };

    MemoryIrisStore::new(vec![
        zone(fixture_zones::CENTRE, "Saint-Merri 1", 0.0),
        zone(fixture_zones::EAST_300M, "Saint-Merri 2", 0.3),
        zone(fixture_zones::EAST_800M, "Arsenal 1", 0.8),
        zone(fixture_zones::EAST_1500M, "Folie-Méricourt 3", 1.5),
        zone(fixture_zones::EAST_5KM, "Bercy 7", 5.0),
        LocatedZone::new(fixture_zones::LYON, "Croix-Rousse 1", 45.7640, 4.8357),
    ])
}

/// PostgreSQL store whose pool is already closed, so every search fails with
/// [`irisfinder_lib::Error::Pool`] without touching the network.
#[derive(Debug, Clone)]
pub struct FailingIrisStore(PgIrisStore);

impl FailingIrisStore {
    pub fn new() -> Self {
        let config = DatabaseConfig {
            tls: TlsMode::Disable,
            ..DatabaseConfig::new("postgres://iris@127.0.0.1:1/iris")
        };
        let store = PgIrisStore::connect(&config).expect("static connection string is valid");
        store.close();
        Self(store)
    }
}

impl Default for FailingIrisStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IrisStore for FailingIrisStore {
    async fn find_within(&self, criteria: &SearchCriteria) -> Result<SearchPage> {
        self.0.find_within(criteria).await
    }
}

/// State backed by [`paris_store`].
pub fn test_state() -> AppState {
    AppState::new(Arc::new(paris_store()))
}

/// State backed by [`FailingIrisStore`].
pub fn failing_state() -> AppState {
    AppState::new(Arc::new(FailingIrisStore::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use irisfinder_lib::memory::haversine_meters;
    use irisfinder_lib::Error;

    #[tokio::test]
    async fn test_paris_store_has_three_zones_within_one_km() {
        let page = test_state()
            .store()
            .find_within(&SearchCriteria::new(PARIS.0, PARIS.1, 1.0))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_fixture_offsets_are_accurate() {
        let (lat, lon) = east_of_paris(0.8);
        let d = haversine_meters(PARIS.0, PARIS.1, lat, lon);
        assert!((d - 800.0).abs() < 1.0, "got {d}");
    }

    #[tokio::test]
    async fn test_failing_store_always_errors() {
        let result = failing_state()
            .store()
            .find_within(&SearchCriteria::new(PARIS.0, PARIS.1, 1.0))
            .await;
        assert!(matches!(result, Err(Error::Pool(_))));
    }
}
