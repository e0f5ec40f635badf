//! Request schema and validation for `POST /find-iris`.

use serde::{Deserialize, Serialize};

use irisfinder_lib::{SearchCriteria, DEFAULT_LIMIT, DEFAULT_PAGE};

use crate::ErrorResponse;

/// Validation trait for request types.
///
/// Implementations check every field and either produce the typed value the
/// handler works with or an [`ErrorResponse`] describing the first problem.
pub trait Validate {
    /// Typed value produced by a successful validation.
    type Output;

    /// Validate the request. `max_limit` caps the accepted page size.
    ///
    /// Returns a boxed `ErrorResponse` to avoid large `Result::Err` variants.
    fn validate(&self, max_limit: u32) -> Result<Self::Output, Box<ErrorResponse>>;
}

/// A JSON number, or a string holding one (`"48.85"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(serde_json::Number),
    Text(String),
}

impl NumericInput {
    /// Finite floating-point value, if the input holds one.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            NumericInput::Number(n) => n.as_f64()?,
            NumericInput::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    /// Non-negative whole value. `2`, `2.0` and `"2"` all yield 2.
    pub fn as_whole(&self) -> Option<u64> {
        match self {
            NumericInput::Number(n) => n.as_u64().or_else(|| whole_from_f64(n.as_f64()?)),
            NumericInput::Text(s) => {
                let s = s.trim();
                s.parse::<u64>()
                    .ok()
                    .or_else(|| whole_from_f64(s.parse::<f64>().ok()?))
            }
        }
    }
}

fn whole_from_f64(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64)
        .then_some(value as u64)
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(NumericInput::Number)
            .unwrap_or_else(|| NumericInput::Text(value.to_string()))
    }
}

impl From<u32> for NumericInput {
    fn from(value: u32) -> Self {
        NumericInput::Number(value.into())
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

/// Body of `POST /find-iris`.
///
/// Every field is optional at the schema level so that a missing coordinate
/// is reported by [`Validate`] with a field-specific message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindIrisRequest {
    /// Latitude of the search centre, decimal degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<NumericInput>,

    /// Longitude of the search centre, decimal degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<NumericInput>,

    /// Search radius in kilometres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<NumericInput>,

    /// 1-based page number (default 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<NumericInput>,

    /// Page size (default 100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<NumericInput>,
}

impl FindIrisRequest {
    /// Request for the first page with default size.
    pub fn new(latitude: f64, longitude: f64, radius: f64) -> Self {
        Self {
            latitude: Some(latitude.into()),
            longitude: Some(longitude.into()),
            radius: Some(radius.into()),
            page: None,
            limit: None,
        }
    }
}

fn bad_request(detail: impl Into<String>) -> Box<ErrorResponse> {
    Box::new(ErrorResponse::bad_request(detail))
}

fn required_number(field: &str, value: &Option<NumericInput>) -> Result<f64, Box<ErrorResponse>> {
    let value = value
        .as_ref()
        .ok_or_else(|| bad_request(format!("Le champ '{}' est obligatoire", field)))?;
    value
        .as_f64()
        .ok_or_else(|| bad_request(format!("Le champ '{}' doit être un nombre", field)))
}

fn optional_count(
    field: &str,
    value: &Option<NumericInput>,
    default: u32,
) -> Result<u32, Box<ErrorResponse>> {
    let Some(value) = value else {
        return Ok(default);
    };
    let whole = value.as_whole().ok_or_else(|| {
        bad_request(format!("Le champ '{}' doit être un entier positif", field))
    })?;
    if whole == 0 {
        return Err(bad_request(format!(
            "Le champ '{}' doit être au moins 1",
            field
        )));
    }
    u32::try_from(whole)
        .map_err(|_| bad_request(format!("Le champ '{}' est trop grand", field)))
}

impl Validate for FindIrisRequest {
    type Output = SearchCriteria;

    fn validate(&self, max_limit: u32) -> Result<SearchCriteria, Box<ErrorResponse>> {
        let latitude = required_number("latitude", &self.latitude)?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(bad_request(
                "Le champ 'latitude' doit être compris entre -90 et 90",
            ));
        }

        let longitude = required_number("longitude", &self.longitude)?;
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(bad_request(
                "Le champ 'longitude' doit être compris entre -180 et 180",
            ));
        }

        let radius = required_number("radius", &self.radius)?;
        if radius < 0.0 {
            return Err(bad_request("Le champ 'radius' ne peut pas être négatif"));
        }

        let page = optional_count("page", &self.page, DEFAULT_PAGE)?;
        let limit = optional_count("limit", &self.limit, DEFAULT_LIMIT)?;
        if limit > max_limit {
            return Err(bad_request(format!(
                "Le champ 'limit' ne peut pas dépasser {}",
                max_limit
            )));
        }

        Ok(SearchCriteria::new(latitude, longitude, radius)
            .with_page(page)
            .with_limit(limit))
    }
}
