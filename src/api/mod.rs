// Read-only HTTP API over the entity store

pub mod query;

pub use query::{create_query_router, QueryAppState};
