use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// NATS configuration
#[derive(Clone, Debug, Deserialize)]
pub struct NatsConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Subject carrying water temperature telemetry
    #[serde(default = "default_telemetry_subject")]
    pub telemetry_subject: String,
    /// Share the subscription with other replicas
    #[serde(default)]
    pub queue_group: Option<String>,
}

fn default_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_telemetry_subject() -> String {
    "telemetry.watertemperature".to_string()
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            telemetry_subject: default_telemetry_subject(),
            queue_group: None,
        }
    }
}

/// NATS client for the telemetry feed
pub struct NatsClient {
    client: async_nats::Client,
    config: NatsConfig,
}

impl NatsClient {
    /// Connect to NATS
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        info!("Connecting to NATS at {}", config.url);

        let client = async_nats::connect(&config.url)
            .await
            .context("Failed to connect to NATS")?;

        Ok(Self { client, config })
    }

    /// Subscribe to the telemetry subject, in the queue group if configured
    pub async fn subscribe_telemetry(&self) -> Result<async_nats::Subscriber> {
        let subject = self.config.telemetry_subject.clone();

        let subscriber = match &self.config.queue_group {
            Some(group) => self
                .client
                .queue_subscribe(subject.clone(), group.clone())
                .await
                .context(format!("Failed to subscribe to '{}' in queue group '{}'", subject, group))?,
            None => self
                .client
                .subscribe(subject.clone())
                .await
                .context(format!("Failed to subscribe to '{}'", subject))?,
        };

        info!(subject = %subject, "Subscribed to telemetry");
        Ok(subscriber)
    }
}
