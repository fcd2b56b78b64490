//! Charging location records as served by `GET /api/locations`.
//!
//! Field names on the wire are camelCase (`locationId`, `zipCode`,
//! `countryISO`, `connectorType`, `maxPower`). Records are not validated
//! beyond deserialization: `status` is the only optional field, every other
//! field must be present for the payload to parse.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level response body from `GET /api/locations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationsResponse {
    pub locations: Vec<Location>,
}

/// Location identifier. The API uses numeric ids for most operators and
/// opaque string ids for some, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationId {
    Number(i64),
    Text(String),
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationId::Number(n) => write!(f, "{n}"),
            LocationId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for LocationId {
    fn from(value: i64) -> Self {
        LocationId::Number(value)
    }
}

impl From<&str> for LocationId {
    fn from(value: &str) -> Self {
        LocationId::Text(value.to_owned())
    }
}

impl LocationId {
    /// Parses an id coming from a query string or CLI flag.
    ///
    /// Integers become [`LocationId::Number`]; anything else is kept as text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse::<i64>()
            .map_or_else(|_| LocationId::Text(raw.to_owned()), LocationId::Number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    pub street: String,
    pub zip_code: String,
    pub city: String,
    #[serde(rename = "countryISO")]
    pub country_iso: String,
}

/// Geographic position in floating point degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A single charging station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub location_id: LocationId,
    pub address: Address,
    pub coordinates: Coordinates,
    pub connector_type: String,
    /// Connector status as reported by the operator (`"Available"`,
    /// `"In Use"`, ...). Absent means unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Maximum power rating in kW.
    pub max_power: f64,
    pub public: bool,
    /// Location category (`"type"` on the wire).
    #[serde(rename = "type")]
    pub kind: String,
}

impl Location {
    /// Address fields matched by the free-text search, in display order.
    #[must_use]
    pub fn searchable_fields(&self) -> [&str; 4] {
        [
            &self.address.name,
            &self.address.street,
            &self.address.city,
            &self.address.zip_code,
        ]
    }
}
