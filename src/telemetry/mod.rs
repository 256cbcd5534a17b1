// Water temperature telemetry reconciliation


use crate::config::IdConfig;
use crate::domain::round_to_tenth;
use crate::metrics::ReconcileMetrics;
use crate::store::{EntityStore, StoreError};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Inbound water temperature reading
#[derive(Clone, Debug, Deserialize)]
pub struct TelemetryEvent {
    #[serde(default)]
    pub origin: Origin,
    pub temp: f64,
    /// RFC 3339 observation time; may be empty
    #[serde(default)]
    pub timestamp: String,
}

/// Device that produced a reading
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Origin {
    #[serde(default)]
    pub device: String,
}

/// Result of handling one telemetry message
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Temperature stored on the returned beach
    Applied(String),
    Stale,
    NotFound,
    /// Message dropped before reaching the store
    Discarded(String),
}

/// Applies telemetry readings to beach water temperatures
pub struct TelemetryReconciler {
    store: Arc<EntityStore>,
    ids: IdConfig,
    metrics: ReconcileMetrics,
}

impl TelemetryReconciler {
    pub fn new(store: Arc<EntityStore>, ids: IdConfig, metrics: ReconcileMetrics) -> Self {
        Self {
            store,
            ids,
            metrics,
        }
    }

    /// Decode and apply a raw message body.
    pub fn handle_payload(&self, payload: &[u8]) -> Outcome {
        match serde_json::from_slice::<TelemetryEvent>(payload) {
            Ok(event) => self.handle_event(&event),
            Err(e) => {
                warn!(error = %e, "Failed to decode telemetry message, discarding");
                self.discard(format!("undecodable payload: {}", e))
            }
        }
    }

    /// Apply a decoded reading.
    pub fn handle_event(&self, event: &TelemetryEvent) -> Outcome {
        if event.timestamp.is_empty() {
            info!(device = %event.origin.device, "Ignored water temperature message with an empty timestamp");
            return self.discard("empty timestamp".to_string());
        }

        if event.origin.device.is_empty() {
            warn!("Ignored water temperature message without a device");
            return self.discard("missing device".to_string());
        }

        let observed_at = match DateTime::parse_from_rfc3339(&event.timestamp) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                warn!(
                    device = %event.origin.device,
                    timestamp = %event.timestamp,
                    error = %e,
                    "Ignored water temperature message with an invalid timestamp"
                );
                return self.discard(format!("invalid timestamp '{}'", event.timestamp));
            }
        };

        let temperature = round_to_tenth(event.temp);
        let sensor_id = self.ids.sensor_id(&event.origin.device);

        match self
            .store
            .update_beach_temperature(&sensor_id, temperature, observed_at)
        {
            Ok(entity_id) => {
                info!(entity_id = %entity_id, temperature, "Updated water temperature");
                self.metrics.record_telemetry_applied();
                Outcome::Applied(entity_id)
            }
            Err(e @ StoreError::StaleUpdate { .. }) => {
                info!(sensor_id = %sensor_id, reason = %e, "Temperature update was ignored");
                self.metrics.record_telemetry_stale();
                Outcome::Stale
            }
            Err(e @ StoreError::NotFound(_)) => {
                debug!(sensor_id = %sensor_id, reason = %e, "Temperature update was ignored");
                self.metrics.record_telemetry_not_found();
                Outcome::NotFound
            }
        }
    }

    fn discard(&self, reason: String) -> Outcome {
        self.metrics.record_telemetry_discarded();
        Outcome::Discarded(reason)
    }

    /// Consume telemetry messages until the subscription closes.
    ///
    /// Each message is handled in place; a store update only holds one
    /// entity's lock, so delivery is never held up longer than that.
    pub async fn run_subscriber(self: Arc<Self>, mut subscriber: async_nats::Subscriber) {
        info!("Starting telemetry subscriber");

        while let Some(message) = subscriber.next().await {
            debug!(subject = %message.subject, bytes = message.payload.len(), "Telemetry message received");
            self.handle_payload(&message.payload);
        }

        warn!("Telemetry subscription closed");
    }
}
