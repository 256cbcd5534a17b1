// Domain model for points of interest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `[longitude, latitude]` in degrees
pub type Position = [f64; 2];

/// Ordered sequence of positions
pub type LineString = Vec<Position>;

/// Outer ring followed by any holes
pub type Polygon = Vec<LineString>;

pub type MultiPolygon = Vec<Polygon>;

/// Entity kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Beach,
    ExerciseTrail,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Beach => "Beach",
            Variant::ExerciseTrail => "ExerciseTrail",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beach" => Ok(Variant::Beach),
            "ExerciseTrail" => Ok(Variant::ExerciseTrail),
            other => Err(format!("unknown entity type '{}'", other)),
        }
    }
}

/// A public bathing place
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beach {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: MultiPolygon,
    /// Statistical area (NUTS) code of the bathing water
    pub nuts_code: Option<String>,
    pub wikidata_id: Option<String>,
    /// Namespaced water temperature sensor identifier
    pub sensor_id: Option<String>,
    /// Latest water temperature (°C, one decimal)
    pub water_temperature: Option<f64>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
}

/// A groomed exercise or ski trail
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseTrail {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Trail length in kilometres
    pub length: Option<f64>,
    pub location: LineString,
    pub source: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub date_last_preparation: Option<DateTime<Utc>>,
}

/// Entity held by the registry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entity {
    Beach(Beach),
    ExerciseTrail(ExerciseTrail),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Beach(b) => &b.id,
            Entity::ExerciseTrail(t) => &t.id,
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            Entity::Beach(_) => Variant::Beach,
            Entity::ExerciseTrail(_) => Variant::ExerciseTrail,
        }
    }

    /// Total number of positions in the entity geometry
    pub fn coordinate_count(&self) -> usize {
        match self {
            Entity::Beach(b) => b
                .location
                .iter()
                .flat_map(|polygon| polygon.iter())
                .map(|ring| ring.len())
                .sum(),
            Entity::ExerciseTrail(t) => t.location.len(),
        }
    }
}

/// Rounds a reading to one decimal place.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
