//! Common test utilities for landfall-camera integration tests
//!
//! This module provides reusable test helpers for:
//! - Building simulated drivers with fast, deterministic timing
//! - Awaiting notifications with a bounded wait
//! - Writing throwaway configuration files

#![allow(dead_code)] // Not every test binary uses every helper

use landfall_camera::drivers::{SimulatedCamera, SimulatedOptions};
use landfall_camera::{CameraBackend, CameraEvent, CameraState, ConnectionStatus, EventReceiver};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Upper bound on any single wait for a notification.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Options with a short round trip and a monitor that stays quiet.
pub fn fast_options() -> SimulatedOptions {
    SimulatedOptions {
        latency_ms: 2,
        poll_interval_ms: 3_600_000,
        ..SimulatedOptions::default()
    }
}

/// A simulated driver behind the trait object hosts use.
pub fn simulated_backend(options: SimulatedOptions) -> Arc<dyn CameraBackend> {
    Arc::new(SimulatedCamera::new(options))
}

/// Next event, failing the test if none arrives within [`EVENT_TIMEOUT`].
pub async fn next_event(rx: &mut EventReceiver) -> CameraEvent {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event bus closed")
}

/// Next state-changed payload within [`EVENT_TIMEOUT`].
pub async fn next_state(rx: &mut EventReceiver) -> CameraState {
    tokio::time::timeout(EVENT_TIMEOUT, rx.next_state())
        .await
        .expect("timed out waiting for state-changed")
        .expect("event bus closed")
}

/// Next connection-status payload within [`EVENT_TIMEOUT`].
pub async fn next_status(rx: &mut EventReceiver) -> ConnectionStatus {
    tokio::time::timeout(EVENT_TIMEOUT, rx.next_status())
        .await
        .expect("timed out waiting for connection-status")
        .expect("event bus closed")
}

/// Wait for the first state-changed snapshot satisfying `predicate`.
pub async fn wait_for_state<F>(rx: &mut EventReceiver, predicate: F) -> CameraState
where
    F: Fn(&CameraState) -> bool,
{
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            match rx.next_state().await {
                Some(state) if predicate(&state) => return state,
                Some(_) => continue,
                None => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for matching state")
}

/// Write `contents` to a temp file that lives as long as the handle.
pub fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}
