use chrono::{TimeZone, Utc};
use poi_registry::config::{IdConfig, SourceConfig, StatusConfig};
use poi_registry::ingest::{fetch_source, FeatureIngester, ReferenceTable};
use poi_registry::metrics::ReconcileMetrics;
use poi_registry::status::StatusPoller;
use poi_registry::telemetry::{Outcome, TelemetryReconciler};
use poi_registry::{Entity, EntityStore, QueryFacade, Variant};
use serde_json::json;
use std::sync::Arc;

fn source_feed() -> String {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "id": 1545,
                "type": "Feature",
                "properties": {
                    "name": "Lillsjöns vinterbad", "type": "Strandbad", "published": true,
                    "created": "2020-06-04 14:26:58", "updated": "2020-12-02 08:46:56",
                    "fields": [
                        {"id": 1, "name": "Beskrivning", "type": "FREETEXT", "value": "En beskrivning om stranden"},
                        {"id": 230, "name": "Temperatursensor", "type": "FREETEXT", "value": "sk-elt-temp-01"}
                    ]
                },
                "geometry": {"type": "MultiPolygon", "coordinates": [[[
                    [617691.144, 6917407.84],
                    [617702.0079999999, 6917408.399999999],
                    [617702.3439999999, 6917414.112],
                    [617699.8799999999, 6917414.335999999],
                    [617690.9199999999, 6917414.56],
                    [617691.144, 6917407.84]
                ]]]}
            },
            {
                "id": 660,
                "type": "Feature",
                "properties": {"name": "Norrhassel", "type": "Strandbad", "published": true, "fields": []},
                "geometry": {"type": "MultiPolygon", "coordinates": [[[
                    [616000.0, 6920000.0], [616010.0, 6920000.0], [616010.0, 6920010.0], [616000.0, 6920000.0]
                ]]]}
            },
            {
                "id": 412,
                "type": "Feature",
                "properties": {"name": "Södra spåret", "type": "Motionsspår", "published": true, "fields": [{"id": 99, "value": 5}]},
                "geometry": {"type": "LineString", "coordinates": [[617000.0, 6916000.0], [617100.0, 6916050.0], [617200.0, 6916120.0]]}
            },
            {
                "id": 999,
                "type": "Feature",
                "properties": {"name": "Stängd strand", "type": "Strandbad", "published": false, "fields": []},
                "geometry": {"type": "MultiPolygon", "coordinates": []}
            }
        ]
    })
    .to_string()
}

async fn load_registry(server: &mockito::ServerGuard) -> Arc<EntityStore> {
    let source = SourceConfig {
        url: format!("{}/facilities", server.url()),
        ..Default::default()
    };
    let reference = ReferenceTable::from_toml_str(
        r#"
        [[entry]]
        feature_id = 660
        sensor = "sk-elt-temp-14"
        "#,
    )
    .unwrap();

    let raw = fetch_source(&source).await.unwrap();
    let ingester = FeatureIngester::from_config(IdConfig::default(), reference, &source);
    Arc::new(EntityStore::new(ingester.ingest(&raw).unwrap()))
}

#[tokio::test]
async fn test_ingest_reconcile_and_query() {
    let mut server = mockito::Server::new_async().await;
    let _feed = server
        .mock("GET", "/facilities")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(source_feed())
        .create_async()
        .await;

    let store = load_registry(&server).await;
    let facade: Arc<dyn QueryFacade> = store.clone();

    assert_eq!(facade.list_by_variant(Variant::Beach).len(), 2);
    assert_eq!(facade.list_by_variant(Variant::ExerciseTrail).len(), 1);

    let beach = facade.get_by_id("se:sundsvall:anlaggning:1545").unwrap();
    assert_eq!(beach.coordinate_count(), 6);
    let Entity::Beach(initial) = beach else {
        panic!("expected beach");
    };
    assert_eq!(
        initial.sensor_id.as_deref(),
        Some("se:servanet:lora:sk-elt-temp-01")
    );

    let metrics = ReconcileMetrics::new();
    let reconciler = TelemetryReconciler::new(store.clone(), IdConfig::default(), metrics.clone());

    let outcome = reconciler.handle_payload(
        json!({"origin": {"device": "sk-elt-temp-01"}, "temp": 18.37, "timestamp": "2021-07-01T10:00:00Z"})
            .to_string()
            .as_bytes(),
    );
    assert_eq!(
        outcome,
        Outcome::Applied("se:sundsvall:anlaggning:1545".to_string())
    );

    let Entity::Beach(updated) = facade.get_by_id("se:sundsvall:anlaggning:1545").unwrap() else {
        panic!("expected beach");
    };
    assert_eq!(updated.water_temperature, Some(18.4));
    assert!(updated.date_modified > initial.date_modified);

    // Sensor from the reference table
    let outcome = reconciler.handle_payload(
        json!({"origin": {"device": "sk-elt-temp-14"}, "temp": 16.02, "timestamp": "2021-07-01T10:05:00Z"})
            .to_string()
            .as_bytes(),
    );
    assert_eq!(
        outcome,
        Outcome::Applied("se:sundsvall:anlaggning:660".to_string())
    );

    // Unpublished beach never made it into the store
    assert!(facade.get_by_id("se:sundsvall:anlaggning:999").is_err());
}

#[tokio::test]
async fn test_status_poll_updates_ingested_trail() {
    let mut server = mockito::Server::new_async().await;
    let _feed = server
        .mock("GET", "/facilities")
        .with_status(200)
        .with_body(source_feed())
        .create_async()
        .await;
    let _status = server
        .mock("GET", "/status")
        .with_status(200)
        .with_body(
            json!({"Ski": {"Södra spåret": {"isActive": true, "externalId": "412", "lastPreparation": "2022-01-15T06:30:00Z"}}})
                .to_string(),
        )
        .create_async()
        .await;

    let store = load_registry(&server).await;
    let config = StatusConfig {
        url: format!("{}/status", server.url()),
        ..Default::default()
    };
    let poller = StatusPoller::new(&config, store.clone(), IdConfig::default(), ReconcileMetrics::new()).unwrap();

    let summary = poller.poll_once().await.unwrap();
    assert_eq!(summary.updated, 1);

    let Entity::ExerciseTrail(trail) = store.get_by_id("se:sundsvall:anlaggning:412").unwrap() else {
        panic!("expected trail");
    };
    assert_eq!(trail.length, Some(5.0));
    assert_eq!(
        trail.date_last_preparation,
        Some(Utc.with_ymd_and_hms(2022, 1, 15, 6, 30, 0).unwrap())
    );
}

#[tokio::test]
async fn test_unavailable_source_aborts_startup() {
    let mut server = mockito::Server::new_async().await;
    let _feed = server
        .mock("GET", "/facilities")
        .with_status(502)
        .create_async()
        .await;

    let source = SourceConfig {
        url: format!("{}/facilities", server.url()),
        ..Default::default()
    };
    let err = fetch_source(&source).await.unwrap_err();
    assert!(matches!(err, poi_registry::IngestError::SourceUnavailable(_)));
}
