use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

// Re-export component config types
pub use crate::ingest::SourceConfig;
pub use crate::nats::NatsConfig;
pub use crate::status::StatusConfig;

/// Config file used when `POI_REGISTRY_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/registry.toml";

/// Complete registry configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub ids: IdConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Identifier namespaces
#[derive(Debug, Clone, Deserialize)]
pub struct IdConfig {
    #[serde(default = "default_facility_prefix")]
    pub beach_prefix: String,
    #[serde(default = "default_facility_prefix")]
    pub trail_prefix: String,
    #[serde(default = "default_sensor_prefix")]
    pub sensor_prefix: String,
}

fn default_facility_prefix() -> String {
    "se:sundsvall:anlaggning:".to_string()
}

fn default_sensor_prefix() -> String {
    "se:servanet:lora:".to_string()
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            beach_prefix: default_facility_prefix(),
            trail_prefix: default_facility_prefix(),
            sensor_prefix: default_sensor_prefix(),
        }
    }
}

impl IdConfig {
    pub fn beach_id(&self, feature_id: i64) -> String {
        format!("{}{}", self.beach_prefix, feature_id)
    }

    /// Trail identifier from a feed id or a status feed `externalId`
    pub fn trail_id(&self, external_id: impl std::fmt::Display) -> String {
        format!("{}{}", self.trail_prefix, external_id)
    }

    pub fn sensor_id(&self, device: &str) -> String {
        format!("{}{}", self.sensor_prefix, device)
    }
}

/// Reference augmentation table location
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    #[serde(default = "default_reference_path")]
    pub path: PathBuf,
}

fn default_reference_path() -> PathBuf {
    PathBuf::from("config/reference.toml")
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            path: default_reference_path(),
        }
    }
}

/// Read API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl RegistryConfig {
    /// Apply overrides from process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Recognised: `SOURCE_DATA_URL`, `SOURCE_DATA_APIKEY`,
    /// `PREPARATION_STATUS_URL`, `NATS_URL`, `POI_REGISTRY_PORT`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SOURCE_DATA_URL") {
            self.source.url = v;
        }
        if let Some(v) = lookup("SOURCE_DATA_APIKEY") {
            self.source.api_key = Some(v);
        }
        if let Some(v) = lookup("PREPARATION_STATUS_URL") {
            self.status.url = v;
        }
        if let Some(v) = lookup("NATS_URL") {
            self.nats.url = v;
        }
        if let Some(v) = lookup("POI_REGISTRY_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.api.port = port;
            }
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<RegistryConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: RegistryConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Load configuration from `POI_REGISTRY_CONFIG` (or the default path when
/// present), then apply environment overrides.
pub fn load() -> Result<RegistryConfig> {
    let explicit = std::env::var("POI_REGISTRY_CONFIG").ok().map(PathBuf::from);

    let mut config = match explicit {
        Some(path) => load_config(&path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => {
            info!("No config file found, using defaults");
            RegistryConfig::default()
        }
    };

    config.apply_env();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.ids.beach_prefix, "se:sundsvall:anlaggning:");
        assert_eq!(config.ids.sensor_prefix, "se:servanet:lora:");
        assert_eq!(config.status.interval_seconds, 60);
        assert_eq!(config.nats.telemetry_subject, "telemetry.watertemperature");
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.source.utc_offset_minutes, 60);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [source]
            url = "https://example.com/facilities"
            api_key = "secret"
            timeout_seconds = 5

            [ids]
            beach_prefix = "urn:beach:"
            trail_prefix = "urn:trail:"

            [status]
            url = "https://example.com/status"
            interval_seconds = 30

            [nats]
            url = "nats://example.com:4222"
            queue_group = "poi"

            [api]
            port = 9000
        "#;

        let config: RegistryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.source.url, "https://example.com/facilities");
        assert_eq!(config.source.api_key.as_deref(), Some("secret"));
        assert_eq!(config.source.timeout_seconds, 5);
        assert_eq!(config.ids.beach_id(1545), "urn:beach:1545");
        assert_eq!(config.ids.trail_id("77"), "urn:trail:77");
        assert_eq!(config.ids.sensor_prefix, "se:servanet:lora:"); // Default
        assert_eq!(config.status.interval_seconds, 30);
        assert_eq!(config.status.timeout_seconds, 10); // Default
        assert_eq!(config.nats.queue_group.as_deref(), Some("poi"));
        assert_eq!(config.api.port, 9000);
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [api]
            port = 3000
        "#;

        let config: RegistryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.status.interval_seconds, 60); // Default
        assert_eq!(config.reference.path, PathBuf::from("config/reference.toml"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SOURCE_DATA_URL", "http://feed"),
            ("SOURCE_DATA_APIKEY", "k"),
            ("PREPARATION_STATUS_URL", "http://status"),
            ("POI_REGISTRY_PORT", "not-a-port"),
        ]
        .into_iter()
        .collect();

        let mut config = RegistryConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.source.url, "http://feed");
        assert_eq!(config.source.api_key.as_deref(), Some("k"));
        assert_eq!(config.status.url, "http://status");
        assert_eq!(config.api.port, 8080); // Unparseable port ignored
    }

    #[test]
    fn test_id_scheme() {
        let ids = IdConfig::default();
        assert_eq!(ids.beach_id(1545), "se:sundsvall:anlaggning:1545");
        assert_eq!(ids.trail_id(412), "se:sundsvall:anlaggning:412");
        assert_eq!(ids.sensor_id("sk-elt-temp-01"), "se:servanet:lora:sk-elt-temp-01");
    }
}
