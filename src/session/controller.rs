// SPDX-License-Identifier: GPL-3.0-only

//! Session controller and serialized event queue
//!
//! The controller owns a worker thread that drains one event queue. Caller
//! operations (`bind`, `unbind`) and platform callbacks all enter through the
//! same queue, so no two of them are ever processed concurrently and each
//! handler runs to completion before the next event is dequeued.

use super::machine::{LoopAction, SessionMachine};
use super::types::{SessionEvent, SessionState, StateChange, ViewportSize};
use super::FrameSink;
use crate::config::SessionConfig;
use crate::errors::{SessionError, SessionResult};
use crate::host::CaptureHost;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

/// Shared state-change observer slot.
///
/// Lives outside the machine so `on_state_changed` can swap the callback
/// from the caller's thread without a round trip through the event queue.
pub type SharedStateObserver = Arc<Mutex<Option<Box<dyn Fn(StateChange) + Send>>>>;

/// Clonable delivery surface for platform callbacks
///
/// Hosts invoke these from whatever execution context the platform uses;
/// each call only enqueues an event, which the worker thread handles in
/// arrival order. Sends after the controller is gone are dropped silently.
#[derive(Clone)]
pub struct SessionEvents {
    tx: UnboundedSender<SessionEvent>,
}

impl SessionEvents {
    pub(crate) fn new(tx: UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    /// The device finished opening
    pub fn device_opened(&self) {
        self.send(SessionEvent::DeviceOpened);
    }

    /// The device failed to open
    pub fn device_error(&self, reason: impl Into<String>) {
        self.send(SessionEvent::DeviceError(reason.into()));
    }

    /// The capture session finished building
    pub fn session_configured(&self) {
        self.send(SessionEvent::SessionConfigured);
    }

    /// The capture session could not be built
    pub fn session_config_failed(&self, reason: impl Into<String>) {
        self.send(SessionEvent::SessionConfigFailed(reason.into()));
    }

    /// The device was disconnected; forces teardown from any state
    pub fn device_disconnected(&self) {
        self.send(SessionEvent::DeviceDisconnected);
    }

    pub(crate) fn send(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            debug!("Session event dropped, queue closed");
        }
    }
}

/// Caller surface for one capture session
///
/// Create one per destination surface. `bind` and `unbind` are idempotent;
/// state-change notifications arrive through [`Self::on_state_changed`].
pub struct SessionController {
    events: SessionEvents,
    shared_state: Arc<Mutex<SessionState>>,
    observer: SharedStateObserver,
    worker: Option<JoinHandle<()>>,
}

impl SessionController {
    /// Create the controller and start its worker thread.
    ///
    /// The sink is borrowed for the controller's lifetime; the session core
    /// attaches to and detaches from it but never destroys it.
    pub fn new(
        host: Box<dyn CaptureHost>,
        sink: Arc<dyn FrameSink>,
        config: SessionConfig,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = SessionEvents::new(tx);
        let shared_state = Arc::new(Mutex::new(SessionState::Closed));
        let observer: SharedStateObserver = Arc::new(Mutex::new(None));

        let worker_events = events.clone();
        let worker_state = Arc::clone(&shared_state);
        let worker_observer = Arc::clone(&observer);
        let worker = thread::spawn(move || {
            debug!("Session worker thread started");
            let mut machine =
                SessionMachine::new(host, sink, config, worker_state, worker_observer);
            while let Some(event) = rx.blocking_recv() {
                if machine.handle(event, &worker_events) == LoopAction::Stop {
                    break;
                }
            }
            debug!("Session worker thread exiting");
        });

        Self {
            events,
            shared_state,
            observer,
            worker: Some(worker),
        }
    }

    /// Acquire a device and start streaming against the given viewport.
    ///
    /// No-op when a bind is already in progress or active; callers check
    /// [`Self::is_bound`] for the distinction. A zero-area viewport is
    /// rejected synchronously. Everything past validation is asynchronous;
    /// failures arrive through the state-change observer.
    pub fn bind(&self, viewport: ViewportSize) -> SessionResult<()> {
        if viewport.area() == 0 {
            return Err(SessionError::InvalidViewport);
        }
        let state = self.state();
        if state != SessionState::Closed {
            debug!(%state, "Bind ignored, session not closed");
            return Ok(());
        }
        self.events.send(SessionEvent::Bind(viewport));
        Ok(())
    }

    /// Tear the session down; no-op when already unbound.
    ///
    /// When an open or configure step is still in flight, the teardown is
    /// deferred until that step resolves, and the session is guaranteed not
    /// to reach streaming.
    pub fn unbind(&self) {
        self.events.send(SessionEvent::Unbind);
    }

    /// True iff a device is held and the session is usable or being set up
    pub fn is_bound(&self) -> bool {
        self.state().is_bound()
    }

    /// Snapshot of the current session state
    pub fn state(&self) -> SessionState {
        *self.shared_state.lock().unwrap()
    }

    /// Register the state-change observer, replacing any previous one.
    ///
    /// The callback runs on the worker thread for Failed, Streaming and
    /// Closed transitions. `bind`/`unbind` may be called from it (they only
    /// enqueue); `on_state_changed` must not.
    pub fn on_state_changed(&self, callback: impl Fn(StateChange) + Send + 'static) {
        *self.observer.lock().unwrap() = Some(Box::new(callback));
    }

    /// The callback delivery surface, for wiring platform integrations
    pub fn events(&self) -> SessionEvents {
        self.events.clone()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.events.send(SessionEvent::Shutdown);
        if let Some(worker) = self.worker.take() {
            debug!("Waiting for session worker to finish");
            if worker.join().is_err() {
                warn!("Session worker thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .finish()
    }
}
