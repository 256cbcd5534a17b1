// Coordinate projection
pub mod geo;

// Entity data model
pub mod domain;

// Source feed ingestion
pub mod ingest;

// Entity store and read interface
pub mod store;

// Live update channels
pub mod telemetry;
pub mod status;

// Reconciliation counters
pub mod metrics;

// NATS client integration
pub mod nats;

// Read-only HTTP API
pub mod api;

// Configuration
pub mod config;

pub use domain::{Entity, Variant};
pub use ingest::{FeatureIngester, IngestError};
pub use store::{EntityStore, QueryFacade, StoreError};
