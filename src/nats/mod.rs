// NATS client integration

mod client;

pub use client::{NatsClient, NatsConfig};
