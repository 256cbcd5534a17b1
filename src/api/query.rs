use crate::domain::{Entity, Variant};
use crate::metrics::{MetricsSnapshot, ReconcileMetrics};
use crate::store::{QueryFacade, StoreError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state for the query API
pub struct QueryAppState {
    pub facade: Arc<dyn QueryFacade>,
    pub metrics: ReconcileMetrics,
}

/// Query parameters for entity listing
#[derive(Deserialize)]
pub struct EntityQueryParams {
    /// `Beach` or `ExerciseTrail`; all entities when absent
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub beaches: usize,
    pub trails: usize,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create query API router
pub fn create_query_router(state: Arc<QueryAppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/entities", get(list_entities))
        .route("/api/entities/:id", get(get_entity))
        .route("/api/metrics", get(metrics))
        .with_state(state)
}

/// GET /health
async fn health(State(state): State<Arc<QueryAppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        beaches: state.facade.list_by_variant(Variant::Beach).len(),
        trails: state.facade.list_by_variant(Variant::ExerciseTrail).len(),
    })
}

/// GET /api/entities?type=Beach
async fn list_entities(
    State(state): State<Arc<QueryAppState>>,
    Query(params): Query<EntityQueryParams>,
) -> Result<Json<Vec<Entity>>, QueryError> {
    let variants = match params.entity_type {
        Some(name) => vec![name.parse::<Variant>().map_err(QueryError::BadRequest)?],
        None => vec![Variant::Beach, Variant::ExerciseTrail],
    };

    let entities = variants
        .into_iter()
        .flat_map(|variant| state.facade.list_by_variant(variant))
        .collect();

    Ok(Json(entities))
}

/// GET /api/entities/:id
async fn get_entity(
    State(state): State<Arc<QueryAppState>>,
    Path(id): Path<String>,
) -> Result<Json<Entity>, QueryError> {
    let entity = state.facade.get_by_id(&id)?;
    Ok(Json(entity))
}

/// GET /api/metrics
async fn metrics(State(state): State<Arc<QueryAppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Query error types
#[derive(Debug)]
enum QueryError {
    NotFound(String),
    BadRequest(String),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        QueryError::NotFound(err.to_string())
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            QueryError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            QueryError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Beach, ExerciseTrail};
    use crate::store::EntityStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn create_test_app() -> Router {
        let store = EntityStore::new(vec![
            Entity::Beach(Beach {
                id: "se:sundsvall:anlaggning:1545".to_string(),
                name: Some("Lillsjöns vinterbad".to_string()),
                description: None,
                location: vec![vec![vec![[17.27, 62.36], [17.28, 62.37], [17.27, 62.36]]]],
                nuts_code: None,
                wikidata_id: None,
                sensor_id: None,
                water_temperature: Some(18.4),
                date_created: None,
                date_modified: None,
            }),
            Entity::ExerciseTrail(ExerciseTrail {
                id: "se:sundsvall:anlaggning:412".to_string(),
                name: None,
                description: None,
                length: Some(2.5),
                location: vec![[17.27, 62.36], [17.28, 62.37]],
                source: None,
                date_created: None,
                date_modified: None,
                date_last_preparation: None,
            }),
        ]);

        create_query_router(Arc::new(QueryAppState {
            facade: Arc::new(store),
            metrics: ReconcileMetrics::new(),
        }))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(create_test_app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["beaches"], 1);
        assert_eq!(body["trails"], 1);
    }

    #[tokio::test]
    async fn test_get_entity() {
        let (status, body) =
            get_json(create_test_app(), "/api/entities/se:sundsvall:anlaggning:1545").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "Beach");
        assert_eq!(body["waterTemperature"], 18.4);
    }

    #[tokio::test]
    async fn test_get_missing_entity() {
        let (status, body) = get_json(create_test_app(), "/api/entities/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn test_list_by_type() {
        let (status, body) = get_json(create_test_app(), "/api/entities?type=ExerciseTrail").await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["type"], "ExerciseTrail");
    }

    #[tokio::test]
    async fn test_list_all() {
        let (_, body) = get_json(create_test_app(), "/api/entities").await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_unknown_type() {
        let (status, _) = get_json(create_test_app(), "/api/entities?type=Playground").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics() {
        let (status, body) = get_json(create_test_app(), "/api/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["telemetryApplied"], 0);
    }
}
