//! Multi-camera fan-out through `CameraManager`.

mod common;

use common::{fast_options, simulated_backend, write_config};
use futures::StreamExt;
use landfall_camera::config::{CameraDefinition, RetryConfig};
use landfall_camera::drivers::SimulatedOptions;
use landfall_camera::manager::TaggedEvent;
use landfall_camera::{CameraError, CameraManager, DriverRegistry, Settings, SlateMetadata};
use std::time::Duration;

fn definition(id: &str, identifier: &str) -> CameraDefinition {
    let mut def = CameraDefinition::new(id, "simulated", identifier);
    def.retry = RetryConfig {
        max_attempts: 2,
        initial_backoff_ms: 1,
        max_backoff_ms: 1,
        multiplier: 1.0,
    };
    def.connect_timeout_ms = 1000;
    def
}

fn two_camera_manager() -> CameraManager {
    let mut manager = CameraManager::new();
    manager
        .insert(definition("a-cam", "192.168.1.50"), simulated_backend(fast_options()))
        .unwrap();
    manager
        .insert(definition("b-cam", "192.168.1.51"), simulated_backend(fast_options()))
        .unwrap();
    manager
}

#[tokio::test]
async fn connect_all_and_disconnect_all() {
    let manager = two_camera_manager();

    let report = manager.connect_all().await;
    assert!(report.all_connected());
    assert_eq!(report.connected, vec!["a-cam".to_string(), "b-cam".to_string()]);
    assert_eq!(manager.connected_ids().len(), 2);

    manager.disconnect_all().await;
    assert!(manager.connected_ids().is_empty());

    // Idempotent
    manager.disconnect_all().await;
}

#[tokio::test]
async fn connect_all_reports_failures_per_camera() {
    let mut manager = two_camera_manager();
    manager
        .insert(
            definition("c-cam", "10.0.0.99"),
            simulated_backend(SimulatedOptions {
                reject_identifiers: vec!["10.0.0.99".into()],
                ..fast_options()
            }),
        )
        .unwrap();

    let report = manager.connect_all().await;
    assert!(!report.all_connected());
    assert_eq!(report.connected.len(), 2);
    assert_eq!(report.failed.len(), 1);
    let (id, err) = &report.failed[0];
    assert_eq!(id, "c-cam");
    assert!(matches!(err, CameraError::RetriesExhausted { attempts: 2, .. }));

    manager.disconnect_all().await;
}

#[tokio::test]
async fn record_on_every_camera() {
    let manager = two_camera_manager();
    manager.connect_all().await;

    manager.start_record_all().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !manager
            .ids()
            .iter()
            .all(|id| manager.get(id).is_some_and(|c| c.state().recording))
        {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();

    manager.stop_record_all().await.unwrap();
    manager.disconnect_all().await;
}

#[tokio::test]
async fn slate_every_connected_camera() {
    let mut manager = two_camera_manager();
    manager.connect_all().await;

    // Rejected before any camera is contacted
    let bad: SlateMetadata = [("".to_string(), serde_json::json!("x"))].into_iter().collect();
    assert!(matches!(
        manager.inject_metadata_all(&bad).await,
        Err(CameraError::InvalidMetadata(_))
    ));

    let slate = SlateMetadata::builder().scene("4").take(2).build();
    manager.inject_metadata_all(&slate).await.unwrap();

    // A camera that was never connected is skipped, not failed.
    manager
        .insert(definition("c-cam", "192.168.1.52"), simulated_backend(fast_options()))
        .unwrap();
    manager.inject_metadata_all(&slate).await.unwrap();

    manager.disconnect_all().await;
}

#[tokio::test]
async fn fan_out_skips_disconnected_cameras() {
    let manager = two_camera_manager();
    manager.connect_all().await;

    let b = manager.get("b-cam").unwrap();
    let a = manager.get("a-cam").unwrap();
    a.start_record().await.unwrap();

    b.disconnect().await;
    manager.start_record_all().await.unwrap();
    assert_eq!(manager.connected_ids(), vec!["a-cam".to_string()]);

    manager.disconnect_all().await;
    assert!(matches!(
        manager.stop_record_all().await,
        Err(CameraError::NotConnected)
    ));
}

#[tokio::test]
async fn merged_stream_tags_events() {
    let manager = two_camera_manager();
    let mut events = manager.subscribe_all();

    manager.connect_all().await;

    let mut up = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while up.len() < 2 {
            let TaggedEvent { camera_id, event } = events.next().await.unwrap();
            if event.as_status().is_some_and(|s| s.connected) {
                up.push(camera_id);
            }
        }
    })
    .await
    .unwrap();
    up.sort();
    assert_eq!(up, vec!["a-cam".to_string(), "b-cam".to_string()]);

    manager.disconnect_all().await;
}

#[tokio::test]
async fn manager_from_config_file() {
    let file = write_config(
        r#"
        [[cameras]]
        id = "a-cam"
        driver = "simulated"
        identifier = "192.168.1.50"
        [cameras.options]
        latency_ms = 1
        lens_info = "Test 50mm"

        [[cameras]]
        id = "spare"
        identifier = "192.168.1.60"
        enabled = false
        "#,
    );
    let settings = Settings::load_from(file.path()).unwrap();
    let registry = DriverRegistry::with_builtin().unwrap();
    let manager = CameraManager::from_settings(&settings, &registry).unwrap();
    assert_eq!(manager.ids(), vec!["a-cam".to_string()]);

    let report = manager.connect_all().await;
    assert!(report.all_connected());
    assert_eq!(manager.get("a-cam").unwrap().state().lens_info, "Test 50mm");

    manager.disconnect_all().await;
}
