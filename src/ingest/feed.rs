use serde::Deserialize;
use serde_json::Value;

/// Top-level document of the municipal facility feed
#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub features: Vec<Feature>,
}

/// One facility record
#[derive(Debug, Deserialize)]
pub struct Feature {
    pub id: i64,
    pub properties: FeatureProperties,
    #[serde(default)]
    pub geometry: FeatureGeometry,
}

#[derive(Debug, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub name: Option<String>,
    /// Facility category, e.g. "Strandbad"
    #[serde(rename = "type", default)]
    pub category: String,
    #[serde(default)]
    pub published: bool,
    /// List of `{id, value}` attribute pairs; decoded per feature so that a
    /// bad block is reported against the feature that carries it
    #[serde(default)]
    pub fields: Value,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

/// Geometry in the feed's projected grid
#[derive(Debug, Default, Deserialize)]
pub struct FeatureGeometry {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}
