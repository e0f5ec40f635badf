//! In-memory [`IrisStore`] used by handler tests.
//!
//! Each zone is reduced to one representative point. Distances use the
//! haversine formula on a sphere of mean Earth radius, which stays within
//! 0.5% of the spheroidal distance PostGIS computes for `geography`.

use async_trait::async_trait;

use crate::criteria::{IrisZone, SearchCriteria, SearchPage};
use crate::error::Result;
use crate::store::IrisStore;

/// IUGG mean Earth radius in metres.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance in metres between two WGS 84 coordinates.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_M * a.sqrt().min(1.0).asin()
}

/// A zone plus the point used for distance tests.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedZone {
    pub latitude: f64,
    pub longitude: f64,
    pub zone: IrisZone,
}

impl LocatedZone {
    pub fn new(code: &str, name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            zone: IrisZone::with_code_and_name(code, name),
        }
    }
}

/// Vector-backed store ordered by zone code.
#[derive(Debug, Clone, Default)]
pub struct MemoryIrisStore {
    zones: Vec<LocatedZone>,
}

impl MemoryIrisStore {
    pub fn new(zones: impl IntoIterator<Item = LocatedZone>) -> Self {
        Self {
            zones: zones.into_iter().collect(),
        }
    }

    /// Every zone within the criteria's radius, ordered by code.
    pub fn candidates(&self, criteria: &SearchCriteria) -> Vec<&LocatedZone> {
        let radius_m = criteria.radius_meters();
        let mut matches: Vec<&LocatedZone> = self
            .zones
            .iter()
            .filter(|z| {
                haversine_meters(criteria.latitude, criteria.longitude, z.latitude, z.longitude)
                    <= radius_m
            })
            .collect();
        matches.sort_by(|a, b| a.zone.code().cmp(&b.zone.code()));
        matches
    }
}

#[async_trait]
impl IrisStore for MemoryIrisStore {
    async fn find_within(&self, criteria: &SearchCriteria) -> Result<SearchPage> {
        let candidates = self.candidates(criteria);
        let offset = usize::try_from(criteria.offset()).unwrap_or(usize::MAX);

        let results = candidates
            .iter()
            .skip(offset)
            .take(criteria.limit as usize)
            .map(|z| z.zone.clone())
            .collect();

        Ok(SearchPage {
            total: candidates.len() as i64,
            results,
        })
    }
}
