use anyhow::{Context, Result};
use poi_registry::api::{create_query_router, QueryAppState};
use poi_registry::config;
use poi_registry::ingest::{fetch_source, FeatureIngester, ReferenceTable};
use poi_registry::metrics::ReconcileMetrics;
use poi_registry::nats::NatsClient;
use poi_registry::status::StatusPoller;
use poi_registry::store::EntityStore;
use poi_registry::telemetry::TelemetryReconciler;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poi_registry=info".into()),
        )
        .init();

    info!("POI registry starting...");

    let config = config::load().context("Failed to load configuration")?;

    let reference = if config.reference.path.exists() {
        ReferenceTable::load(&config.reference.path)?
    } else {
        warn!(
            path = %config.reference.path.display(),
            "Reference table not found, continuing without augmentation"
        );
        ReferenceTable::default()
    };
    info!(entries = reference.len(), "Reference table loaded");

    // Initial load is fatal on any error: no partial registry
    let raw = fetch_source(&config.source)
        .await
        .context("Failed to load source feed")?;
    let ingester = FeatureIngester::from_config(config.ids.clone(), reference, &config.source);
    let entities = ingester
        .ingest(&raw)
        .context("Failed to ingest source feed")?;

    let store = Arc::new(EntityStore::new(entities));
    let metrics = ReconcileMetrics::new();

    // Trail preparation status
    let poller = if config.status.url.is_empty() {
        warn!("No preparation status URL configured, trail status polling disabled");
        None
    } else {
        let poller = StatusPoller::new(
            &config.status,
            Arc::clone(&store),
            config.ids.clone(),
            metrics.clone(),
        )?;
        Some(poller.start())
    };

    // Water temperature telemetry
    let reconciler = Arc::new(TelemetryReconciler::new(
        Arc::clone(&store),
        config.ids.clone(),
        metrics.clone(),
    ));
    let telemetry_handle = match NatsClient::connect(config.nats.clone()).await {
        Ok(client) => match client.subscribe_telemetry().await {
            Ok(subscriber) => Some(tokio::spawn(async move {
                // Keep the connection alive for the subscriber's lifetime
                let _client = client;
                reconciler.run_subscriber(subscriber).await;
            })),
            Err(e) => {
                error!(error = %e, "Telemetry subscription failed, serving without live temperatures");
                None
            }
        },
        Err(e) => {
            error!(error = %e, "NATS unavailable, serving without live temperatures");
            None
        }
    };

    // Start HTTP API server
    let router = create_query_router(Arc::new(QueryAppState {
        facade: store,
        metrics,
    }));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.api.port))
        .await
        .context("Failed to bind API port")?;
    info!(port = config.api.port, "Query API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "Query API server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    if let Some(handle) = telemetry_handle {
        handle.abort();
    }
    if let Some(poller) = poller {
        poller.shutdown().await;
    }
    info!("POI registry stopped");

    Ok(())
}
