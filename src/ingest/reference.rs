use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// External references for one feature that the feed does not carry itself
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ReferenceEntry {
    pub feature_id: i64,
    /// Sensor device name, used when the feature has no sensor field
    #[serde(default)]
    pub sensor: Option<String>,
    #[serde(default)]
    pub nuts_code: Option<String>,
    #[serde(default)]
    pub wikidata: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReferenceFile {
    #[serde(default)]
    entry: Vec<ReferenceEntry>,
}

/// Augmentation table keyed by source feature id.
///
/// Loaded from TOML:
///
/// ```toml
/// [[entry]]
/// feature_id = 660
/// sensor = "sk-elt-temp-01"
/// nuts_code = "SE0712281000003473"
/// ```
#[derive(Clone, Debug, Default)]
pub struct ReferenceTable {
    entries: HashMap<i64, ReferenceEntry>,
}

impl ReferenceTable {
    pub fn new(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.feature_id, e)).collect(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ReferenceFile =
            toml::from_str(contents).context("Failed to parse reference table")?;
        Ok(Self::new(file.entry))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference table {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn get(&self, feature_id: i64) -> Option<&ReferenceEntry> {
        self.entries.get(&feature_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
