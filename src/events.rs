//! Driver notification channels.
//!
//! Every driver owns one [`EventBus`]. Both notification kinds, state-changed
//! and connection-status, travel on a single `tokio::sync::broadcast` channel
//! so observers see them in exactly the order the driver emitted them, even
//! when some come from a background monitor task and others from a host call.
//!
//! # Data Flow
//!
//! ```text
//! driver / monitor task --[CameraEvent]--> broadcast::channel ---> EventReceiver (UI, logging)
//!                                                             \--> Subscription callbacks
//! ```
//!
//! Emission never blocks the driver. An observer that falls more than
//! `capacity` events behind skips ahead and a warning is logged.

use crate::connection::ConnectionStatus;
use crate::error::{CameraError, CameraResult};
use crate::state::CameraState;
use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{trace, warn};

/// Default number of events buffered per observer.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A notification emitted by a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraEvent {
    /// The camera state snapshot changed; carries the full new snapshot.
    StateChanged(CameraState),
    /// The link came up, went down or failed to come up.
    ConnectionStatus(ConnectionStatus),
}

impl CameraEvent {
    /// The snapshot, if this is a state-changed event.
    pub fn as_state(&self) -> Option<&CameraState> {
        match self {
            CameraEvent::StateChanged(state) => Some(state),
            CameraEvent::ConnectionStatus(_) => None,
        }
    }

    /// The status, if this is a connection-status event.
    pub fn as_status(&self) -> Option<&ConnectionStatus> {
        match self {
            CameraEvent::ConnectionStatus(status) => Some(status),
            CameraEvent::StateChanged(_) => None,
        }
    }
}

/// One-to-many, ordered delivery of a driver's notifications.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CameraEvent>,
    source: String,
}

impl EventBus {
    /// Bus buffering [`DEFAULT_EVENT_CAPACITY`] events per observer.
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_capacity(source, DEFAULT_EVENT_CAPACITY)
    }

    /// Bus with an explicit per-observer buffer.
    pub fn with_capacity(source: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            source: source.into(),
        }
    }

    /// Name of the driver that owns this bus.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Emit a state-changed notification. Returns the number of observers reached.
    pub fn emit_state(&self, state: CameraState) -> usize {
        self.emit(CameraEvent::StateChanged(state))
    }

    /// Emit a connection-status notification. Returns the number of observers reached.
    pub fn emit_status(&self, status: ConnectionStatus) -> usize {
        self.emit(CameraEvent::ConnectionStatus(status))
    }

    /// Emit any event. Having no observers is not an error.
    pub fn emit(&self, event: CameraEvent) -> usize {
        trace!(source = %self.source, ?event, "emit");
        self.sender.send(event).unwrap_or(0)
    }

    /// Register a new observer. It receives events emitted from now on.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            source: self.source.clone(),
        }
    }

    /// Number of live observers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Attach a callback observer.
    ///
    /// Events are forwarded to `callback` on a spawned task in emission order.
    /// Dropping the returned [`Subscription`] detaches the callback. Requires a
    /// running tokio runtime.
    pub fn connect<F>(&self, mut callback: F) -> CameraResult<Subscription>
    where
        F: FnMut(CameraEvent) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CameraError::Runtime(format!("cannot attach observer: {}", e)))?;
        let mut receiver = self.subscribe();
        let task = runtime.spawn(async move {
            while let Some(event) = receiver.recv().await {
                callback(event);
            }
        });
        Ok(Subscription { task })
    }
}

/// Receiving end of an [`EventBus`].
#[derive(Debug)]
pub struct EventReceiver {
    receiver: broadcast::Receiver<CameraEvent>,
    source: String,
}

impl EventReceiver {
    /// Next event, or `None` once the driver has been dropped.
    pub async fn recv(&mut self) -> Option<CameraEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(source = %self.source, skipped, "Observer lagged; skipping events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-emitted event without waiting.
    pub fn try_recv(&mut self) -> Option<CameraEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(source = %self.source, skipped, "Observer lagged; skipping events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Skip ahead to the next state-changed payload.
    pub async fn next_state(&mut self) -> Option<CameraState> {
        while let Some(event) = self.recv().await {
            if let CameraEvent::StateChanged(state) = event {
                return Some(state);
            }
        }
        None
    }

    /// Skip ahead to the next connection-status payload.
    pub async fn next_status(&mut self) -> Option<ConnectionStatus> {
        while let Some(event) = self.recv().await {
            if let CameraEvent::ConnectionStatus(status) = event {
                return Some(status);
            }
        }
        None
    }

    /// Drain everything emitted so far.
    pub fn drain(&mut self) -> Vec<CameraEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Convert into a `Stream`, dropping lag notices.
    pub fn into_stream(self) -> impl Stream<Item = CameraEvent> + Send + Unpin {
        let source = self.source;
        BroadcastStream::new(self.receiver).filter_map(move |item| {
            let event = match item {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(source = %source, %err, "Observer lagged; skipping events");
                    None
                }
            };
            futures::future::ready(event)
        })
    }
}

/// Handle for a callback observer attached with [`EventBus::connect`].
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Detach the callback now.
    pub fn disconnect(self) {
        self.task.abort();
    }

    /// Whether the forwarding task is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
