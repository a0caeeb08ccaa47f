//! Observable values
//!
//! Latest-value cells built on `tokio::sync::watch`. Drivers keep their
//! `CameraState` and `ConnectionState` in observables so hosts can read the
//! current value without locking, or await the next change without polling.
//!
//! Unlike the event bus, a watch receiver only ever sees the newest value:
//! use it for "what is the camera doing now", and the event bus for "every
//! change, in order".

use crate::error::CameraResult;
use tokio::sync::watch;

/// Latest value of one piece of driver state, with change notification.
pub struct Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    sender: watch::Sender<T>,
    /// Shown in `Debug` output, e.g. "simulated.state"
    name: String,
}

impl<T: Clone + Send + Sync + 'static> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("name", &self.name)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, initial_value: T) -> Self {
        let (sender, _) = watch::channel(initial_value);
        Self {
            sender,
            name: name.into(),
        }
    }

    /// Current value (clone).
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Apply `update` to the current value atomically.
    ///
    /// `update` returns `Ok(true)` to notify subscribers, `Ok(false)` to leave
    /// them undisturbed. On error the value is left as it was. The closure
    /// runs under the channel's write lock, so it must not block.
    pub fn modify<F>(&self, update: F) -> CameraResult<bool>
    where
        F: FnOnce(&mut T) -> CameraResult<bool>,
    {
        let mut outcome = Ok(false);
        self.sender.send_if_modified(|value| {
            let mut candidate = value.clone();
            outcome = update(&mut candidate);
            if matches!(outcome, Ok(true)) {
                *value = candidate;
                true
            } else {
                false
            }
        });
        outcome
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Replace the value only if it differs, returning whether it changed.
    pub fn replace_if_changed(&self, value: T) -> CameraResult<bool> {
        self.modify(|current| {
            if *current == value {
                Ok(false)
            } else {
                *current = value;
                Ok(true)
            }
        })
    }
}
