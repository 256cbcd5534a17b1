// Trail preparation status polling


use crate::config::IdConfig;
use crate::metrics::ReconcileMetrics;
use crate::store::EntityStore;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Preparation status feed configuration
#[derive(Clone, Debug, Deserialize)]
pub struct StatusConfig {
    /// Empty disables polling
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            interval_seconds: default_interval_seconds(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Status document: `{"Ski": {<name>: {...}}}`. Records are kept raw so a
/// single bad record does not discard the rest.
#[derive(Debug, Default, Deserialize)]
pub struct StatusReport {
    #[serde(rename = "Ski", default)]
    pub ski: HashMap<String, Value>,
}

/// Preparation state of one facility
#[derive(Debug, Deserialize)]
pub struct FacilityStatus {
    #[serde(rename = "isActive", default)]
    pub active: bool,
    #[serde(rename = "externalId", default)]
    pub external_id: String,
    #[serde(rename = "lastPreparation", default)]
    pub last_preparation: String,
}

/// Outcome of applying one status report
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub updated: usize,
    /// Records that were active but could not be applied
    pub skipped: usize,
    /// Inactive records or records without an external id
    pub ignored: usize,
}

/// Periodically copies trail preparation times from the status feed into the store
pub struct StatusPoller {
    http_client: Client,
    url: String,
    interval: Duration,
    store: Arc<EntityStore>,
    ids: IdConfig,
    metrics: ReconcileMetrics,
}

impl StatusPoller {
    pub fn new(
        config: &StatusConfig,
        store: Arc<EntityStore>,
        ids: IdConfig,
        metrics: ReconcileMetrics,
    ) -> Result<Self> {
        if config.interval_seconds == 0 {
            bail!("status poll interval must be at least one second");
        }
        if config.timeout_seconds == 0 {
            bail!("status request timeout must be at least one second");
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build status HTTP client")?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
            interval: Duration::from_secs(config.interval_seconds),
            store,
            ids,
            metrics,
        })
    }

    /// Override the delay between polls. A zero delay is ignored.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval.is_zero() {
            warn!(
                interval_secs = self.interval.as_secs_f64(),
                "Ignoring zero status poll interval"
            );
            return self;
        }
        self.interval = interval;
        self
    }

    /// Fetch the current status report.
    pub async fn fetch(&self) -> Result<StatusReport> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .context("Failed to request trail status update")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "loading data from {} failed with status {}",
                self.url,
                status
            ));
        }

        response
            .json::<StatusReport>()
            .await
            .context("Failed to parse trail status response")
    }

    /// Apply every active record that names a trail.
    pub fn apply(&self, report: &StatusReport) -> PollSummary {
        let mut summary = PollSummary::default();

        for (name, raw) in &report.ski {
            let record: FacilityStatus = match serde_json::from_value(raw.clone()) {
                Ok(record) => record,
                Err(e) => {
                    warn!(facility = %name, error = %e, "Failed to decode trail status record");
                    self.skip(&mut summary);
                    continue;
                }
            };

            if !record.active || record.external_id.is_empty() {
                summary.ignored += 1;
                continue;
            }

            let trail_id = self.ids.trail_id(&record.external_id);

            let groomed_at = match DateTime::parse_from_rfc3339(&record.last_preparation) {
                Ok(t) => t.with_timezone(&Utc),
                Err(e) => {
                    warn!(
                        facility = %name,
                        entity_id = %trail_id,
                        value = %record.last_preparation,
                        error = %e,
                        "Failed to parse last preparation time"
                    );
                    self.skip(&mut summary);
                    continue;
                }
            };

            match self.store.update_trail_last_groomed(&trail_id, groomed_at) {
                Ok(()) => {
                    debug!(facility = %name, entity_id = %trail_id, "Trail preparation time updated");
                    self.metrics.record_trail_updated();
                    summary.updated += 1;
                }
                Err(e) => {
                    error!(facility = %name, error = %e, "Failed to update trail status");
                    self.skip(&mut summary);
                }
            }
        }

        summary
    }

    fn skip(&self, summary: &mut PollSummary) {
        self.metrics.record_trail_record_skipped();
        summary.skipped += 1;
    }

    /// One fetch-and-apply iteration.
    pub async fn poll_once(&self) -> Result<PollSummary> {
        let report = self.fetch().await?;
        Ok(self.apply(&report))
    }

    /// Starts the polling loop (non-blocking).
    ///
    /// Polls immediately, then waits the full interval after every attempt,
    /// successful or not. The returned handle stops the loop between
    /// iterations.
    pub fn start(self) -> StatusPollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));

        StatusPollerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            url = %self.url,
            interval_secs = self.interval.as_secs_f64(),
            "Starting trail status poller"
        );

        loop {
            match self.poll_once().await {
                Ok(summary) => {
                    self.metrics.record_poll_succeeded();
                    info!(
                        updated = summary.updated,
                        skipped = summary.skipped,
                        ignored = summary.ignored,
                        "Trail status poll complete"
                    );
                }
                Err(e) => {
                    self.metrics.record_poll_failed();
                    error!(error = %e, "Trail status poll failed");
                }
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                // Fires on a stop signal or when the handle is dropped
                _ = shutdown.changed() => break,
            }
        }

        info!("Trail status poller stopped");
    }
}

/// Stop signal and task of a running poller
pub struct StatusPollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StatusPollerHandle {
    /// Signal the poller to stop and wait for its current iteration to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Trail status poller task failed");
        }
    }
}
