// Source feed ingestion: feed parsing, reprojection and reference augmentation

mod feed;
mod fields;
mod reference;
mod source;


pub use reference::{ReferenceEntry, ReferenceTable};
pub use source::{fetch_source, SourceConfig, API_KEY_HEADER};

use crate::config::IdConfig;
use crate::domain::{
    Beach, Entity, ExerciseTrail, LineString, MultiPolygon, Polygon, Position, Variant,
};
use crate::geo;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use feed::{Feature, FeatureCollection, FeatureGeometry};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

/// Feed category of beaches
pub const CATEGORY_BEACH: &str = "Strandbad";
/// Feed category of exercise trails
pub const CATEGORY_TRAIL: &str = "Motionsspår";

/// Local timestamp format of `created`/`updated`
const FEED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ingestion failures. Any of these aborts the whole load.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestError {
    SourceUnavailable(String),
    MalformedFeed(String),
    MalformedGeometry { feature_id: i64, reason: String },
    MalformedAttributes { feature_id: i64, reason: String },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::SourceUnavailable(reason) => {
                write!(f, "source feed unavailable: {}", reason)
            }
            IngestError::MalformedFeed(reason) => write!(f, "malformed source feed: {}", reason),
            IngestError::MalformedGeometry { feature_id, reason } => {
                write!(f, "malformed geometry in feature {}: {}", feature_id, reason)
            }
            IngestError::MalformedAttributes { feature_id, reason } => {
                write!(f, "malformed attributes in feature {}: {}", feature_id, reason)
            }
        }
    }
}

impl std::error::Error for IngestError {}

/// Turns the raw facility feed into registry entities
pub struct FeatureIngester {
    ids: IdConfig,
    reference: ReferenceTable,
    utc_offset: FixedOffset,
    attribution: Option<String>,
}

impl FeatureIngester {
    /// Create an ingester reading feed timestamps as UTC.
    pub fn new(ids: IdConfig, reference: ReferenceTable) -> Self {
        Self {
            ids,
            reference,
            utc_offset: Utc.fix(),
            attribution: None,
        }
    }

    /// Create an ingester from the source configuration.
    pub fn from_config(ids: IdConfig, reference: ReferenceTable, source: &SourceConfig) -> Self {
        let ingester = Self::new(ids, reference).with_attribution(source.attribution.clone());
        match FixedOffset::east_opt(source.utc_offset_minutes * 60) {
            Some(offset) => ingester.with_utc_offset(offset),
            None => {
                warn!(
                    utc_offset_minutes = source.utc_offset_minutes,
                    "Invalid feed UTC offset, reading timestamps as UTC"
                );
                ingester
            }
        }
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_attribution(mut self, attribution: Option<String>) -> Self {
        self.attribution = attribution;
        self
    }

    /// Parse the feed and build an entity for every published feature of a
    /// recognised category.
    pub fn ingest(&self, raw: &[u8]) -> Result<Vec<Entity>, IngestError> {
        let collection: FeatureCollection = serde_json::from_slice(raw)
            .map_err(|e| IngestError::MalformedFeed(e.to_string()))?;

        let total = collection.features.len();
        let mut entities = Vec::new();

        for feature in collection.features {
            if !feature.properties.published {
                continue;
            }

            let variant = match feature.properties.category.as_str() {
                CATEGORY_BEACH => Variant::Beach,
                CATEGORY_TRAIL => Variant::ExerciseTrail,
                other => {
                    debug!(feature_id = feature.id, category = %other, "Skipping unrecognised category");
                    continue;
                }
            };

            let entity = match variant {
                Variant::Beach => Entity::Beach(self.build_beach(feature)?),
                Variant::ExerciseTrail => Entity::ExerciseTrail(self.build_trail(feature)?),
            };

            debug!(entity_id = %entity.id(), variant = %entity.variant(), "Ingested feature");
            entities.push(entity);
        }

        info!(
            features = total,
            entities = entities.len(),
            feed_type = %collection.kind,
            "Source feed ingested"
        );

        Ok(entities)
    }

    fn build_beach(&self, feature: Feature) -> Result<Beach, IngestError> {
        let Feature {
            id,
            properties,
            geometry,
        } = feature;

        let location = project_multipolygon(id, geometry)?;
        let attributes = fields::extract(id, properties.fields)?;
        let reference = self.reference.get(id);

        let sensor = attributes
            .sensor
            .or_else(|| reference.and_then(|r| r.sensor.clone()))
            .map(|device| self.ids.sensor_id(&device));

        Ok(Beach {
            id: self.ids.beach_id(id),
            name: properties.name.filter(|n| !n.is_empty()),
            description: attributes.description,
            location,
            nuts_code: reference.and_then(|r| r.nuts_code.clone()),
            wikidata_id: reference.and_then(|r| r.wikidata.clone()),
            sensor_id: sensor,
            water_temperature: None,
            date_created: self.parse_timestamp(id, properties.created.as_deref()),
            date_modified: self.parse_timestamp(id, properties.updated.as_deref()),
        })
    }

    fn build_trail(&self, feature: Feature) -> Result<ExerciseTrail, IngestError> {
        let Feature {
            id,
            properties,
            geometry,
        } = feature;

        let location = project_line_string(id, geometry)?;
        let attributes = fields::extract(id, properties.fields)?;

        Ok(ExerciseTrail {
            id: self.ids.trail_id(id),
            name: properties.name.filter(|n| !n.is_empty()),
            description: attributes.description,
            length: attributes.length,
            location,
            source: self.attribution.clone(),
            date_created: self.parse_timestamp(id, properties.created.as_deref()),
            date_modified: self.parse_timestamp(id, properties.updated.as_deref()),
            date_last_preparation: None,
        })
    }

    /// Missing or unparseable timestamps are left absent.
    fn parse_timestamp(&self, feature_id: i64, raw: Option<&str>) -> Option<DateTime<Utc>> {
        let raw = raw?;
        let parsed = NaiveDateTime::parse_from_str(raw, FEED_TIMESTAMP_FORMAT)
            .ok()
            .and_then(|naive| self.utc_offset.from_local_datetime(&naive).single());

        if parsed.is_none() {
            debug!(feature_id, value = %raw, "Ignoring unparseable feed timestamp");
        }

        parsed.map(|t| t.with_timezone(&Utc))
    }
}

fn malformed_geometry(feature_id: i64, reason: impl Into<String>) -> IngestError {
    IngestError::MalformedGeometry {
        feature_id,
        reason: reason.into(),
    }
}

fn expect_geometry_type(
    feature_id: i64,
    geometry: &FeatureGeometry,
    expected: &str,
) -> Result<(), IngestError> {
    if geometry.kind != expected {
        return Err(malformed_geometry(
            feature_id,
            format!("expected {} geometry, got '{}'", expected, geometry.kind),
        ));
    }
    Ok(())
}

fn decode_coordinates<T>(feature_id: i64, coordinates: Value) -> Result<T, IngestError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(coordinates).map_err(|e| malformed_geometry(feature_id, e.to_string()))
}

/// Reprojects one `[easting, northing, ..]` grid position.
fn project_position(feature_id: i64, raw: &[f64]) -> Result<Position, IngestError> {
    match raw {
        [easting, northing, ..] => {
            let (lon, lat) = geo::project(*easting, *northing);
            Ok([lon, lat])
        }
        _ => Err(malformed_geometry(
            feature_id,
            format!("position has {} ordinates", raw.len()),
        )),
    }
}

fn project_ring(feature_id: i64, ring: &[Vec<f64>]) -> Result<LineString, IngestError> {
    ring.iter()
        .map(|position| project_position(feature_id, position))
        .collect()
}

fn project_multipolygon(
    feature_id: i64,
    geometry: FeatureGeometry,
) -> Result<MultiPolygon, IngestError> {
    expect_geometry_type(feature_id, &geometry, "MultiPolygon")?;
    let raw: Vec<Vec<Vec<Vec<f64>>>> = decode_coordinates(feature_id, geometry.coordinates)?;

    raw.iter()
        .map(|polygon| {
            polygon
                .iter()
                .map(|ring| project_ring(feature_id, ring))
                .collect::<Result<Polygon, IngestError>>()
        })
        .collect()
}

fn project_line_string(
    feature_id: i64,
    geometry: FeatureGeometry,
) -> Result<LineString, IngestError> {
    expect_geometry_type(feature_id, &geometry, "LineString")?;
    let raw: Vec<Vec<f64>> = decode_coordinates(feature_id, geometry.coordinates)?;
    project_ring(feature_id, &raw)
}
