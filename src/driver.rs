//! Shared plumbing for driver implementations.
//!
//! Concrete drivers embed a [`DriverCore`] and delegate the bookkeeping the
//! contract demands to it:
//!
//! - the current [`CameraState`] and [`ConnectionState`], each held in an
//!   [`Observable`];
//! - validated lifecycle transitions;
//! - ordered emission on the driver's [`EventBus`];
//! - the background monitor task (battery/status polling);
//! - cancellation of in-flight I/O waits when `disconnect` is called.
//!
//! Emission rules enforced here:
//!
//! - snapshots are only published while connected (or recording), and only
//!   when they differ from the current one;
//! - once [`DriverCore::begin_disconnect`] succeeds nothing is published
//!   except the final reset done by [`DriverCore::finish_disconnect`];
//! - "replace snapshot + broadcast" happens under one lock, so observers see
//!   events in the order the snapshots were applied.

use crate::connection::{ConnectionState, ConnectionStatus};
use crate::error::{CameraError, CameraResult};
use crate::events::{EventBus, EventReceiver};
use crate::observable::Observable;
use crate::state::CameraState;
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound on how long `stop_monitor` waits for the task to exit.
pub const MONITOR_STOP_TIMEOUT: Duration = Duration::from_secs(2);

struct MonitorHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// An in-progress connect started by [`DriverCore::begin_connect_attempt`].
///
/// Dropping it unsettled (for example when the caller's `connect` future is
/// cancelled by a timeout) returns the lifecycle to `Disconnected`, so the
/// next `connect` is not refused.
#[must_use = "dropping the attempt abandons the connect"]
pub struct ConnectAttempt<'a> {
    core: &'a DriverCore,
    settled: bool,
}

impl ConnectAttempt<'_> {
    /// Complete the attempt. See [`DriverCore::finish_connect`].
    pub fn finish(mut self, initial: CameraState, message: impl Into<String>) -> CameraResult<()> {
        self.settled = true;
        self.core.finish_connect(initial, message)
    }

    /// Give up on the attempt. See [`DriverCore::fail_connect`].
    pub fn fail(mut self, reason: impl Into<String>) {
        self.settled = true;
        self.core.fail_connect(reason);
    }
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(driver = %self.core.driver, "Connect attempt dropped");
            self.core.fail_connect("Connect abandoned");
        }
    }
}

/// State, lifecycle and notification bookkeeping for one driver instance.
pub struct DriverCore {
    driver: String,
    instance_id: Uuid,
    state: Observable<CameraState>,
    connection: Observable<ConnectionState>,
    events: EventBus,
    /// Serializes "apply + emit" so delivery order matches apply order
    emit_lock: Mutex<()>,
    monitor: Mutex<Option<MonitorHandle>>,
    cancel: Notify,
}

impl std::fmt::Debug for DriverCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverCore")
            .field("driver", &self.driver)
            .field("instance_id", &self.instance_id)
            .field("connection", &self.connection.get())
            .finish()
    }
}

impl DriverCore {
    /// Fresh core: default state, disconnected, no observers.
    pub fn new(driver: impl Into<String>) -> Self {
        let driver = driver.into();
        Self {
            instance_id: Uuid::new_v4(),
            state: Observable::new(format!("{}.state", driver), CameraState::default()),
            connection: Observable::new(
                format!("{}.connection", driver),
                ConnectionState::Disconnected,
            ),
            events: EventBus::new(driver.clone()),
            emit_lock: Mutex::new(()),
            monitor: Mutex::new(None),
            cancel: Notify::new(),
            driver,
        }
    }

    /// Driver name this core belongs to.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Unique id of this driver instance, for log correlation.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Current snapshot.
    pub fn state(&self) -> CameraState {
        self.state.get()
    }

    /// Current lifecycle state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.get()
    }

    /// The driver's notification bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Shorthand for `events().subscribe()`.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Latest-value view of the snapshot.
    pub fn watch_state(&self) -> watch::Receiver<CameraState> {
        self.state.subscribe()
    }

    /// Latest-value view of the lifecycle state.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Move the lifecycle to `next`, rejecting edges the lifecycle forbids.
    pub fn transition(&self, next: ConnectionState, operation: &'static str) -> CameraResult<()> {
        let _guard = self.emit_lock.lock();
        self.transition_locked(next, operation)
    }

    fn transition_locked(&self, next: ConnectionState, operation: &'static str) -> CameraResult<()> {
        self.connection.modify(|current| {
            if !current.can_transition_to(next) {
                return Err(CameraError::InvalidState {
                    operation,
                    state: *current,
                });
            }
            debug!(driver = %self.driver, from = %current, to = %next, "transition");
            *current = next;
            Ok(true)
        })?;
        Ok(())
    }

    /// Fail unless commands can be sent to the camera.
    pub fn require_connected(&self, operation: &'static str) -> CameraResult<ConnectionState> {
        let state = self.connection_state();
        match state {
            s if s.is_connected() => Ok(s),
            ConnectionState::Disconnected => Err(CameraError::NotConnected),
            s => Err(CameraError::InvalidState {
                operation,
                state: s,
            }),
        }
    }

    /// Publish a replacement snapshot.
    ///
    /// Returns `Ok(true)` when the snapshot changed and was emitted, `Ok(false)`
    /// when it equals the current one. Fails with `NotConnected` outside the
    /// connected states so late completions cannot emit after a disconnect.
    pub fn publish_state(&self, next: CameraState) -> CameraResult<bool> {
        let _guard = self.emit_lock.lock();
        if !self.connection.get().is_connected() {
            return Err(CameraError::NotConnected);
        }
        self.apply_locked(next)
    }

    /// Build the next snapshot from the current one and publish it.
    pub fn update_state<F>(&self, update: F) -> CameraResult<bool>
    where
        F: FnOnce(CameraState) -> CameraState,
    {
        let _guard = self.emit_lock.lock();
        if !self.connection.get().is_connected() {
            return Err(CameraError::NotConnected);
        }
        let next = update(self.state.get());
        self.apply_locked(next)
    }

    fn apply_locked(&self, next: CameraState) -> CameraResult<bool> {
        let changed = self.state.replace_if_changed(next.clone())?;
        if changed {
            self.events.emit_state(next);
        }
        Ok(changed)
    }

    /// Move between `Connected` and `Recording` and publish the flag together.
    ///
    /// No-op when already in the requested substate.
    pub fn set_recording(&self, recording: bool) -> CameraResult<bool> {
        let _guard = self.emit_lock.lock();
        let target = if recording {
            ConnectionState::Recording
        } else {
            ConnectionState::Connected
        };
        let current = self.connection.get();
        if current == target {
            return Ok(false);
        }
        let operation = if recording {
            "confirm recording"
        } else {
            "confirm stop"
        };
        self.transition_locked(target, operation)?;
        self.apply_locked(self.state.get().with_recording(recording))
    }

    /// Emit a connection-status notification.
    pub fn report_status(&self, status: ConnectionStatus) {
        let _guard = self.emit_lock.lock();
        if status.connected {
            info!(driver = %self.driver, message = %status.message, "Camera link up");
        } else {
            warn!(driver = %self.driver, message = %status.message, "Camera link down");
        }
        self.events.emit_status(status);
    }

    /// `Disconnected -> Connecting`. Fails if a connection is already live or pending.
    pub fn begin_connect(&self) -> CameraResult<()> {
        self.transition(ConnectionState::Connecting, "connect")
    }

    /// [`begin_connect`](Self::begin_connect) that reverts itself if the
    /// attempt is dropped before it is settled.
    pub fn begin_connect_attempt(&self) -> CameraResult<ConnectAttempt<'_>> {
        self.begin_connect()?;
        Ok(ConnectAttempt {
            core: self,
            settled: false,
        })
    }

    /// `Connecting -> Connected`, publishing the first readings and a status.
    ///
    /// Fails with `InvalidState` when a disconnect overtook the attempt.
    pub fn finish_connect(&self, initial: CameraState, message: impl Into<String>) -> CameraResult<()> {
        let _guard = self.emit_lock.lock();
        self.transition_locked(ConnectionState::Connected, "complete connect")?;
        self.apply_locked(initial)?;
        let status = ConnectionStatus::up(message);
        info!(driver = %self.driver, message = %status.message, "Camera link up");
        self.events.emit_status(status);
        Ok(())
    }

    /// `Connecting -> Disconnected` after a failed attempt, reporting `reason`.
    ///
    /// Emits no state change. Harmless if a disconnect already moved the
    /// lifecycle on.
    pub fn fail_connect(&self, reason: impl Into<String>) {
        let _guard = self.emit_lock.lock();
        let status = ConnectionStatus::down(reason);
        if self
            .transition_locked(ConnectionState::Disconnected, "abort connect")
            .is_ok()
        {
            warn!(driver = %self.driver, message = %status.message, "Connect failed");
            self.events.emit_status(status);
        }
    }

    /// Enter `Disconnecting` and wake any in-flight I/O waits.
    ///
    /// Returns `false` when already disconnected (or disconnecting), in which
    /// case the caller must do nothing further.
    pub fn begin_disconnect(&self) -> bool {
        let _guard = self.emit_lock.lock();
        let entered = self
            .transition_locked(ConnectionState::Disconnecting, "disconnect")
            .is_ok();
        if entered {
            self.cancel.notify_waiters();
        }
        entered
    }

    /// `Disconnecting -> Disconnected`: reset the snapshot and report `message`.
    pub fn finish_disconnect(&self, message: impl Into<String>) {
        let _guard = self.emit_lock.lock();
        if self
            .transition_locked(ConnectionState::Disconnected, "finish disconnect")
            .is_err()
        {
            return;
        }
        if let Ok(true) = self.state.replace_if_changed(CameraState::default()) {
            self.events.emit_state(CameraState::default());
        }
        let status = ConnectionStatus::down(message);
        info!(driver = %self.driver, message = %status.message, "Camera disconnected");
        self.events.emit_status(status);
    }

    /// Wait until the lifecycle reaches `Disconnected`.
    ///
    /// Lets a second concurrent `disconnect` return only once the first one
    /// has finished tearing down.
    pub async fn wait_disconnected(&self) {
        let mut rx = self.connection.subscribe();
        let _ = rx
            .wait_for(|state| *state == ConnectionState::Disconnected)
            .await;
    }

    /// Resolves when `begin_disconnect` is called.
    ///
    /// Use in `tokio::select!` around transport waits. Only waits that are
    /// already pending when the disconnect starts are woken, so callers must
    /// still check the lifecycle afterwards.
    pub async fn cancelled(&self) {
        self.cancel.notified().await;
    }

    /// Run `io`, abandoning it if the driver starts disconnecting.
    pub async fn cancellable<F, T>(&self, io: F) -> CameraResult<T>
    where
        F: Future<Output = CameraResult<T>>,
    {
        tokio::select! {
            result = io => result,
            _ = self.cancelled() => Err(CameraError::NotConnected),
        }
    }

    /// Start the background monitor task.
    ///
    /// `task` receives a shutdown signal and must return promptly once it
    /// fires. Any monitor already running is replaced (and signalled).
    pub fn spawn_monitor<F, Fut>(&self, task: F) -> CameraResult<()>
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CameraError::Runtime(format!("cannot start monitor: {}", e)))?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = runtime.spawn(task(shutdown_rx));
        let previous = self.monitor.lock().replace(MonitorHandle {
            shutdown_tx,
            task: handle,
        });
        if let Some(previous) = previous {
            let _ = previous.shutdown_tx.send(());
            previous.task.abort();
        }
        debug!(driver = %self.driver, "Monitor started");
        Ok(())
    }

    /// Whether a monitor task is running.
    pub fn monitor_running(&self) -> bool {
        self.monitor
            .lock()
            .as_ref()
            .is_some_and(|m| !m.task.is_finished())
    }

    /// Signal the monitor task and wait for it to exit.
    pub async fn stop_monitor(&self) {
        let Some(monitor) = self.monitor.lock().take() else {
            return;
        };
        let _ = monitor.shutdown_tx.send(());
        let mut task = monitor.task;
        match tokio::time::timeout(MONITOR_STOP_TIMEOUT, &mut task).await {
            Ok(_) => debug!(driver = %self.driver, "Monitor stopped"),
            Err(_) => {
                warn!(driver = %self.driver, "Monitor did not stop in time; aborting");
                task.abort();
            }
        }
    }
}

impl Drop for DriverCore {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.get_mut().take() {
            monitor.task.abort();
        }
    }
}
