//! Host-side ownership of several cameras.
//!
//! A multi-camera unit (A-cam, B-cam, ...) is driven as one: connect
//! everything, roll everything, slate everything. [`CameraManager`] builds
//! drivers from [`Settings`] through a [`DriverRegistry`] and fans
//! operations out to them concurrently.

use crate::backend::CameraBackend;
use crate::config::{CameraDefinition, Settings};
use crate::error::{CameraError, CameraResult};
use crate::events::CameraEvent;
use crate::metadata::SlateMetadata;
use crate::registry::DriverRegistry;
use crate::retry::{connect_with_retry, RetryPolicy};
use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// An event tagged with the id of the camera that emitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    /// Camera id from the configuration
    pub camera_id: String,
    /// The event itself
    pub event: CameraEvent,
}

/// Outcome of [`CameraManager::connect_all`].
#[derive(Debug, Default)]
pub struct ConnectReport {
    /// Cameras that came up
    pub connected: Vec<String>,
    /// Cameras that did not, with the reason
    pub failed: Vec<(String, CameraError)>,
}

impl ConnectReport {
    /// Whether every camera connected.
    pub fn all_connected(&self) -> bool {
        self.failed.is_empty()
    }
}

struct ManagedCamera {
    definition: CameraDefinition,
    backend: Arc<dyn CameraBackend>,
}

/// Named collection of camera drivers.
#[derive(Default)]
pub struct CameraManager {
    cameras: BTreeMap<String, ManagedCamera>,
}

impl std::fmt::Debug for CameraManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraManager")
            .field("cameras", &self.ids())
            .finish()
    }
}

impl CameraManager {
    /// Empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a driver for every enabled camera in `settings`.
    pub fn from_settings(settings: &Settings, registry: &DriverRegistry) -> CameraResult<Self> {
        let mut manager = Self::new();
        for definition in settings.enabled_cameras() {
            let backend = registry.create(&definition.driver, &definition.options)?;
            manager.insert(definition.clone(), backend)?;
        }
        info!(cameras = manager.len(), "Camera manager ready");
        Ok(manager)
    }

    /// Add a camera. Ids are unique.
    pub fn insert(&mut self, definition: CameraDefinition, backend: Arc<dyn CameraBackend>) -> CameraResult<()> {
        if self.cameras.contains_key(&definition.id) {
            return Err(CameraError::Configuration(format!(
                "Duplicate camera id '{}'",
                definition.id
            )));
        }
        self.cameras.insert(
            definition.id.clone(),
            ManagedCamera {
                definition,
                backend,
            },
        );
        Ok(())
    }

    /// Driver for camera `id`.
    pub fn get(&self, id: &str) -> Option<Arc<dyn CameraBackend>> {
        self.cameras.get(id).map(|c| c.backend.clone())
    }

    /// Configuration the camera was created from.
    pub fn definition(&self, id: &str) -> Option<&CameraDefinition> {
        self.cameras.get(id).map(|c| &c.definition)
    }

    /// Camera ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.cameras.keys().cloned().collect()
    }

    /// Ids of cameras currently connected.
    pub fn connected_ids(&self) -> Vec<String> {
        self.cameras
            .iter()
            .filter(|(_, c)| c.backend.connection_state().is_connected())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of cameras.
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    /// Whether no cameras are managed.
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Connect every camera concurrently, each with its own retry policy.
    pub async fn connect_all(&self) -> ConnectReport {
        let attempts = self.cameras.iter().map(|(id, camera)| async move {
            let policy = RetryPolicy::from(&camera.definition.retry);
            let result = connect_with_retry(
                camera.backend.as_ref(),
                &camera.definition.identifier,
                &policy,
                camera.definition.connect_timeout(),
            )
            .await;
            (id.clone(), result)
        });

        let mut report = ConnectReport::default();
        for (id, result) in join_all(attempts).await {
            match result {
                Ok(_) => report.connected.push(id),
                Err(e) => {
                    warn!(camera = %id, error = %e, "Camera did not connect");
                    report.failed.push((id, e));
                }
            }
        }
        report
    }

    /// Disconnect every camera concurrently. Idempotent.
    pub async fn disconnect_all(&self) {
        join_all(self.cameras.values().map(|c| c.backend.disconnect())).await;
        info!(cameras = self.len(), "All cameras disconnected");
    }

    /// Start recording on every connected camera.
    pub async fn start_record_all(&self) -> CameraResult<()> {
        self.for_each_connected("start recording", |camera| camera.start_record())
            .await
    }

    /// Stop recording on every connected camera.
    pub async fn stop_record_all(&self) -> CameraResult<()> {
        self.for_each_connected("stop recording", |camera| camera.stop_record())
            .await
    }

    /// Slate every connected camera.
    ///
    /// Cameras whose driver cannot take slates are skipped.
    pub async fn inject_metadata_all(&self, metadata: &SlateMetadata) -> CameraResult<()> {
        metadata.validate()?;
        self.for_each_connected("inject metadata", |camera| async move {
            if camera.capabilities().slate_metadata {
                camera.inject_metadata(metadata).await
            } else {
                Ok(())
            }
        })
        .await
    }

    /// One merged stream of every camera's events, tagged with the camera id.
    ///
    /// Per-camera order is preserved; there is no ordering across cameras.
    pub fn subscribe_all(&self) -> BoxStream<'static, TaggedEvent> {
        let streams = self.cameras.iter().map(|(id, camera)| {
            let camera_id = id.clone();
            camera
                .backend
                .subscribe()
                .into_stream()
                .map(move |event| TaggedEvent {
                    camera_id: camera_id.clone(),
                    event,
                })
                .boxed()
        });
        stream::select_all(streams).boxed()
    }

    async fn for_each_connected<'a, F, Fut>(&'a self, operation: &'static str, op: F) -> CameraResult<()>
    where
        F: Fn(&'a dyn CameraBackend) -> Fut,
        Fut: Future<Output = CameraResult<()>> + 'a,
    {
        let targets: Vec<(&String, &ManagedCamera)> = self
            .cameras
            .iter()
            .filter(|(_, c)| c.backend.connection_state().is_connected())
            .collect();
        if targets.is_empty() {
            return Err(CameraError::NotConnected);
        }

        let results = join_all(targets.iter().map(|&(id, camera)| {
            let call = op(camera.backend.as_ref());
            async move { (id, call.await) }
        }))
        .await;

        let failures: Vec<(String, CameraError)> = results
            .into_iter()
            .filter_map(|(id, result)| {
                result.err().map(|e| {
                    warn!(camera = %id, operation, error = %e, "Camera operation failed");
                    (id.clone(), e)
                })
            })
            .collect();

        if failures.is_empty() {
            info!(operation, cameras = targets.len(), "Operation applied");
            Ok(())
        } else {
            Err(CameraError::FanOutFailed {
                operation,
                failures,
            })
        }
    }
}
