// SPDX-License-Identifier: MPL-2.0

//! Platform capture host abstraction
//!
//! A [`CaptureHost`] is the port to the underlying camera platform. The
//! session core issues every hardware call through it and never touches raw
//! device resources itself.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  SessionController  │  ← caller surface, owns the event queue
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │   SessionMachine    │  ← state machine, sole owner of handles
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CaptureHost trait  │  ← platform port
//! └──────────┬──────────┘
//!            │
//!            ▼
//!        ┌───────┐
//!        │ V4L2  │  ← concrete implementation (Linux)
//!        └───────┘
//! ```
//!
//! Opening the device and building the capture session complete
//! asynchronously: the host reports the outcome through the
//! [`SessionEvents`](crate::session::controller::SessionEvents) proxy it is
//! handed, never through a return value. A synchronous platform simply posts
//! the completion event before returning.

pub mod v4l2;

pub use v4l2::{V4l2Host, V4l2HostConfig};

use crate::session::controller::SessionEvents;
use crate::session::types::{CaptureSize, DeviceDescriptor, SinkTarget};
use std::fmt;

/// Result type for synchronous host operations
pub type HostResult<T> = Result<T, HostError>;

/// Error from a synchronous host operation
#[derive(Debug, Clone)]
pub enum HostError {
    /// Underlying device I/O failure
    Io(String),
    /// Operation issued against a resource the host does not hold
    InvalidHandle(&'static str),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Io(msg) => write!(f, "I/O error: {}", msg),
            HostError::InvalidHandle(what) => write!(f, "No such resource held: {}", what),
        }
    }
}

impl std::error::Error for HostError {}

/// Complete capture platform trait
///
/// Implementations hold the raw platform resources internally; the session
/// machine tracks logical ownership and guarantees that each operation is
/// only issued from its legal predecessor state. At most one device and one
/// session are held at a time.
pub trait CaptureHost: Send {
    // ===== Enumeration =====

    /// Enumerate available capture devices with their capability snapshots
    fn list_devices(&mut self) -> Vec<DeviceDescriptor>;

    // ===== Asynchronous acquisition =====

    /// Begin opening the device.
    ///
    /// Completion is delivered as `device_opened` or `device_error` on
    /// `events`. A disconnect at any later point is delivered as
    /// `device_disconnected`.
    fn open_device(&mut self, device: &DeviceDescriptor, events: &SessionEvents);

    /// Begin building a capture session for the chosen size, targeting the
    /// sink's writable handle.
    ///
    /// Completion is delivered as `session_configured` or
    /// `session_config_failed` on `events`. Requires an open device.
    fn build_session(&mut self, target: SinkTarget, size: CaptureSize, events: &SessionEvents);

    // ===== Streaming =====

    /// Start the repeating capture request.
    ///
    /// `continuous_autofocus` asks the device to keep refocusing while
    /// streaming; hosts whose hardware has no focus actuator may ignore it.
    fn start_repeating(&mut self, continuous_autofocus: bool) -> HostResult<()>;

    /// Stop the repeating capture request
    fn stop_repeating(&mut self) -> HostResult<()>;

    /// Abort captures still in flight after the repeating request stopped
    fn abort_captures(&mut self) -> HostResult<()>;

    // ===== Release =====

    /// Release the capture session. Requires the repeating request stopped.
    fn release_session(&mut self) -> HostResult<()>;

    /// Release the device. Requires the session released.
    fn release_device(&mut self) -> HostResult<()>;
}
