//! Search criteria and result types shared by every [`crate::IrisStore`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Page returned when the caller does not ask for one.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_LIMIT: u32 = 100;

/// Typed, validated parameters of one geodesic radius search.
///
/// `page` is 1-based. Callers are expected to reject `page == 0` and
/// `limit == 0` before building criteria; [`SearchCriteria::offset`] still
/// never goes negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Latitude of the search centre in decimal degrees (WGS 84).
    pub latitude: f64,
    /// Longitude of the search centre in decimal degrees (WGS 84).
    pub longitude: f64,
    /// Search radius in kilometres.
    pub radius_km: f64,
    /// 1-based page number.
    pub page: u32,
    /// Maximum number of zones per page.
    pub limit: u32,
}

impl SearchCriteria {
    /// Criteria for the first page with the default page size.
    pub fn new(latitude: f64, longitude: f64, radius_km: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_km,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Number of candidate rows skipped before this page: `(page - 1) * limit`.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)).saturating_mul(i64::from(self.limit))
    }

    /// Radius converted to metres, the unit PostGIS geography functions expect.
    pub fn radius_meters(&self) -> f64 {
        self.radius_km * 1000.0
    }
}

/// One IRIS zone row as exposed by the source table.
///
/// The store selects every column, so the record is kept as an opaque JSON
/// object. `code_iris` and `nom_iris` are always present in well-formed data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IrisZone(Map<String, Value>);

impl IrisZone {
    pub const CODE_FIELD: &'static str = "code_iris";
    pub const NAME_FIELD: &'static str = "nom_iris";

    /// Convenience constructor for a zone with only a code and a name.
    pub fn with_code_and_name(code: impl Into<String>, name: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(Self::CODE_FIELD.to_string(), Value::String(code.into()));
        fields.insert(Self::NAME_FIELD.to_string(), Value::String(name.into()));
        Self(fields)
    }

    pub fn code(&self) -> Option<&str> {
        self.0.get(Self::CODE_FIELD).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get(Self::NAME_FIELD).and_then(Value::as_str)
    }

    /// Raw access to any other column of the row.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }
}

/// Total size of the candidate set plus the requested slice of it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchPage {
    /// Cardinality of the full candidate set, before pagination.
    pub total: i64,
    /// Zones on the requested page, at most `limit` of them.
    pub results: Vec<IrisZone>,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self::default()
    }
}
