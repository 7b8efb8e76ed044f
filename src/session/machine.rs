// SPDX-License-Identifier: GPL-3.0-only

//! Session state machine
//!
//! The machine is the sole owner of the bound device and the active capture
//! session. It runs on the controller's worker thread and handles one event
//! at a time to completion; every hardware call it issues goes through the
//! [`CaptureHost`] port from the legal predecessor state.

use super::controller::{SessionEvents, SharedStateObserver};
use super::selection::optimal_capture_size;
use super::transform::center_fill_transform;
use super::types::{
    CaptureSize, DeviceDescriptor, SessionEvent, SessionState, StateChange, ViewportSize,
};
use super::FrameSink;
use crate::config::SessionConfig;
use crate::errors::{ErrorKind, SessionError};
use crate::host::CaptureHost;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Action returned by the event handler to control the worker loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Keep draining the queue
    Continue,
    /// Stop the worker loop
    Stop,
}

/// Teardown steps in their one legal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TeardownStage {
    StopRepeating,
    AbortCaptures,
    ReleaseSession,
    ReleaseDevice,
    DetachSink,
}

/// Monotonic guard over the teardown progression.
///
/// Running a step at or before the last completed one means a released
/// handle could be touched; that is a programming-contract breach, fatal in
/// test builds.
struct TeardownOrder {
    last: Option<TeardownStage>,
}

impl TeardownOrder {
    fn new() -> Self {
        Self { last: None }
    }

    fn advance(&mut self, next: TeardownStage) -> Result<(), SessionError> {
        if let Some(last) = self.last {
            if next <= last {
                debug_assert!(false, "teardown step {:?} issued after {:?}", next, last);
                return Err(SessionError::ContractViolation(format!(
                    "teardown step {:?} issued after {:?}",
                    next, last
                )));
            }
        }
        self.last = Some(next);
        Ok(())
    }
}

fn enforce(order: &mut TeardownOrder, stage: TeardownStage) {
    if let Err(err) = order.advance(stage) {
        error!(error = %err, "Teardown order breached");
    }
}

/// State machine for one capture device and one active session
pub struct SessionMachine {
    host: Box<dyn CaptureHost>,
    sink: Arc<dyn FrameSink>,
    config: SessionConfig,
    state: SessionState,
    /// Mirror read by the controller for `is_bound` queries
    shared_state: Arc<Mutex<SessionState>>,
    observer: SharedStateObserver,
    /// Descriptor of the device selected by the current bind
    device: Option<DeviceDescriptor>,
    capture_size: Option<CaptureSize>,
    viewport: Option<ViewportSize>,
    device_open: bool,
    session_active: bool,
    repeating: bool,
    sink_attached: bool,
    /// Unbind arrived while an async step was in flight
    pending_unbind: bool,
}

impl SessionMachine {
    pub fn new(
        host: Box<dyn CaptureHost>,
        sink: Arc<dyn FrameSink>,
        config: SessionConfig,
        shared_state: Arc<Mutex<SessionState>>,
        observer: SharedStateObserver,
    ) -> Self {
        Self {
            host,
            sink,
            config,
            state: SessionState::Closed,
            shared_state,
            observer,
            device: None,
            capture_size: None,
            viewport: None,
            device_open: false,
            session_active: false,
            repeating: false,
            sink_attached: false,
            pending_unbind: false,
        }
    }

    /// Current state (worker-thread view)
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handle one event to completion
    pub fn handle(&mut self, event: SessionEvent, events: &SessionEvents) -> LoopAction {
        debug!(state = %self.state, event = ?event, "Handling session event");
        match event {
            SessionEvent::Bind(viewport) => self.on_bind(viewport, events),
            SessionEvent::Unbind => self.on_unbind(),
            SessionEvent::DeviceOpened => self.on_device_opened(events),
            SessionEvent::DeviceError(reason) => self.on_device_error(reason),
            SessionEvent::SessionConfigured => self.on_session_configured(),
            SessionEvent::SessionConfigFailed(reason) => self.on_session_config_failed(reason),
            SessionEvent::DeviceDisconnected => self.on_device_disconnected(),
            SessionEvent::Shutdown => {
                if self.state != SessionState::Closed {
                    self.teardown();
                }
                return LoopAction::Stop;
            }
        }
        LoopAction::Continue
    }

    fn on_bind(&mut self, viewport: ViewportSize, events: &SessionEvents) {
        if self.state != SessionState::Closed {
            debug!(state = %self.state, "Bind ignored, session not closed");
            return;
        }
        if viewport.area() == 0 {
            // the controller rejects this before enqueueing; keep the guard
            warn!(%viewport, "Bind with zero-area viewport ignored");
            return;
        }

        self.set_state(SessionState::Opening);

        let Some(device) = self.host.list_devices().into_iter().next() else {
            self.fail(SessionError::DeviceUnavailable(
                "no capture devices found".to_string(),
            ));
            return;
        };
        if device.supported_sizes.is_empty() {
            self.fail(SessionError::DeviceUnavailable(format!(
                "device {} reports no capture sizes",
                device.name
            )));
            return;
        }

        let size = match optimal_capture_size(&device.supported_sizes, viewport) {
            Ok(size) => size,
            Err(err) => {
                self.fail(err);
                return;
            }
        };

        info!(device = %device.name, capture = %size, %viewport, "Opening capture device");
        self.viewport = Some(viewport);
        self.capture_size = Some(size);
        self.host.open_device(&device, events);
        self.device = Some(device);
    }

    fn on_unbind(&mut self) {
        match self.state {
            SessionState::Closed | SessionState::Closing => {
                debug!(state = %self.state, "Unbind ignored, session not bound");
            }
            SessionState::Opening | SessionState::SessionConfiguring => {
                debug!(state = %self.state, "Unbind deferred until the pending platform callback resolves");
                self.pending_unbind = true;
            }
            SessionState::DeviceReady | SessionState::Streaming | SessionState::Failed(_) => {
                self.teardown();
            }
        }
    }

    fn on_device_opened(&mut self, events: &SessionEvents) {
        if self.state != SessionState::Opening {
            // A disconnect can force teardown while the open was in flight;
            // the late handle must not leak.
            warn!(state = %self.state, "Stale device-open notification, releasing device");
            if let Err(err) = self.host.release_device() {
                warn!(error = %err, "Stale device release failed");
            }
            return;
        }

        self.device_open = true;
        if self.pending_unbind {
            debug!("Unbind requested while opening, tearing down");
            self.teardown();
            return;
        }

        self.set_state(SessionState::DeviceReady);
        self.configure_session(events);
    }

    fn on_device_error(&mut self, reason: String) {
        if self.state != SessionState::Opening {
            warn!(state = %self.state, reason = %reason, "Stale device-error notification ignored");
            return;
        }
        // nothing was acquired
        self.device = None;
        self.fail(SessionError::DeviceOpenFailed(reason));
        if self.pending_unbind {
            self.teardown();
        }
    }

    /// Auto-step out of DeviceReady: apply the viewport transform to the
    /// sink and request the capture-session build targeting it.
    fn configure_session(&mut self, events: &SessionEvents) {
        let (Some(size), Some(viewport)) = (self.capture_size, self.viewport) else {
            self.fail(SessionError::ContractViolation(
                "session configuration without a negotiated size".to_string(),
            ));
            return;
        };

        let transform = center_fill_transform(size, viewport);
        debug!(
            scale_x = transform.scale_x,
            scale_y = transform.scale_y,
            translate_x = transform.translate_x,
            translate_y = transform.translate_y,
            "Applying viewport transform"
        );
        self.sink.set_transform(transform);
        self.sink_attached = true;

        let target = self.sink.capture_target();
        self.set_state(SessionState::SessionConfiguring);
        self.host.build_session(target, size, events);
    }

    fn on_session_configured(&mut self) {
        if self.state != SessionState::SessionConfiguring {
            warn!(state = %self.state, "Stale session-configured notification, releasing session");
            if let Err(err) = self.host.release_session() {
                warn!(error = %err, "Stale session release failed");
            }
            return;
        }

        self.session_active = true;
        if self.pending_unbind {
            debug!("Unbind requested while configuring, tearing down");
            self.teardown();
            return;
        }

        match self.host.start_repeating(self.config.continuous_autofocus) {
            Ok(()) => {
                self.repeating = true;
                self.set_state(SessionState::Streaming);
                info!("Capture session streaming");
                self.notify(StateChange::Streaming);
            }
            Err(err) => {
                self.fail(SessionError::SessionConfigFailed(format!(
                    "repeating request failed: {}",
                    err
                )));
            }
        }
    }

    fn on_session_config_failed(&mut self, reason: String) {
        if self.state != SessionState::SessionConfiguring {
            warn!(state = %self.state, reason = %reason, "Stale session-config-failed notification ignored");
            return;
        }
        // device handle is retained but unusable until the caller unbinds
        self.fail(SessionError::SessionConfigFailed(reason));
        if self.pending_unbind {
            self.teardown();
        }
    }

    fn on_device_disconnected(&mut self) {
        if self.state == SessionState::Closed {
            debug!("Disconnect with nothing bound");
            return;
        }
        warn!(state = %self.state, "Device disconnected, forcing teardown");
        self.notify(StateChange::Failed(ErrorKind::DeviceDisconnected));
        self.teardown();
    }

    /// Ordered teardown: stop repeating, abort in-flight captures, release
    /// the session, release the device, drop the sink association. Steps for
    /// resources that were never acquired are skipped; the order itself is
    /// guarded by [`TeardownOrder`].
    fn teardown(&mut self) {
        if let Some(device) = &self.device {
            debug!(device = %device.name, "Tearing down capture session");
        }
        self.set_state(SessionState::Closing);
        let mut order = TeardownOrder::new();

        if self.repeating {
            enforce(&mut order, TeardownStage::StopRepeating);
            if let Err(err) = self.host.stop_repeating() {
                warn!(error = %err, "Stopping repeating request failed");
            }
            self.repeating = false;
        }

        if self.session_active {
            enforce(&mut order, TeardownStage::AbortCaptures);
            if let Err(err) = self.host.abort_captures() {
                warn!(error = %err, "Aborting in-flight captures failed");
            }
            enforce(&mut order, TeardownStage::ReleaseSession);
            if let Err(err) = self.host.release_session() {
                warn!(error = %err, "Releasing capture session failed");
            }
            self.session_active = false;
        }

        if self.device_open {
            enforce(&mut order, TeardownStage::ReleaseDevice);
            if let Err(err) = self.host.release_device() {
                warn!(error = %err, "Releasing capture device failed");
            }
            self.device_open = false;
        }

        if self.sink_attached {
            enforce(&mut order, TeardownStage::DetachSink);
            self.sink.detach();
            self.sink_attached = false;
        }

        self.device = None;
        self.capture_size = None;
        self.viewport = None;
        self.pending_unbind = false;

        self.set_state(SessionState::Closed);
        info!("Capture session closed");
        self.notify(StateChange::Closed);
    }

    fn fail(&mut self, err: SessionError) {
        error!(error = %err, "Capture session failure");
        let kind = err.kind();
        self.set_state(SessionState::Failed(kind));
        self.notify(StateChange::Failed(kind));
    }

    fn set_state(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "Session state transition");
        self.state = next;
        *self.shared_state.lock().unwrap() = next;
    }

    fn notify(&self, change: StateChange) {
        let observer = self.observer.lock().unwrap();
        if let Some(callback) = observer.as_ref() {
            callback(change);
        }
    }
}
