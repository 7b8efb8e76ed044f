// SPDX-License-Identifier: GPL-3.0-only
// Shared types for the capture session core

//! Shared types for capture session management

use crate::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a capture device
///
/// The platform layer decides what the identifier means (a device node path,
/// a node id, an index); the session core only passes it back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which way the device's lens faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LensFacing {
    /// Facing the user (selfie camera)
    Front,
    /// Facing away from the user
    Back,
    /// External or unknown mounting (USB webcams report this)
    #[default]
    External,
}

impl fmt::Display for LensFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LensFacing::Front => write!(f, "front"),
            LensFacing::Back => write!(f, "back"),
            LensFacing::External => write!(f, "external"),
        }
    }
}

/// Capability snapshot for one capture device
///
/// Immutable once enumerated. Exclusively owned by the session machine while
/// the device is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    /// Human-readable device name (card name, model string)
    pub name: String,
    /// Capture resolutions the device can emit, in driver order
    pub supported_sizes: Vec<CaptureSize>,
    pub facing: LensFacing,
}

/// Pixel resolution at which the device emits frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureSize {
    pub width: u32,
    pub height: u32,
}

impl CaptureSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for CaptureSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Destination rendering surface's pixel dimensions
///
/// Supplied by the caller; may change between bind calls (rotation) but not
/// during an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

impl fmt::Display for ViewportSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Scale and translate pair mapping capture-space pixels onto viewport-space
///
/// The translation is expressed in viewport coordinates and applied before
/// the scale (pre-translate, then pre-scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

/// Opaque handle the platform layer resolves to its writable frame target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkTarget(u64);

impl SinkTarget {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Lifecycle state of the bound device and its capture session
///
/// Exactly one instance exists per bound device. No hardware call is issued
/// except from its legal predecessor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing acquired
    #[default]
    Closed,
    /// Device-open request issued, completion pending
    Opening,
    /// Device handle held, session not yet requested
    DeviceReady,
    /// Capture-session build requested, completion pending
    SessionConfiguring,
    /// Repeating capture request running
    Streaming,
    /// A hardware step failed; resources may still be held until unbind
    Failed(ErrorKind),
    /// Ordered teardown in progress
    Closing,
}

impl SessionState {
    /// True iff a device is held and the session is usable or being set up
    pub fn is_bound(&self) -> bool {
        matches!(
            self,
            SessionState::DeviceReady | SessionState::SessionConfiguring | SessionState::Streaming
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Closed => write!(f, "closed"),
            SessionState::Opening => write!(f, "opening"),
            SessionState::DeviceReady => write!(f, "device ready"),
            SessionState::SessionConfiguring => write!(f, "configuring"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Failed(kind) => write!(f, "failed ({})", kind),
            SessionState::Closing => write!(f, "closing"),
        }
    }
}

/// Notification delivered to the state-change observer
///
/// Only the states the caller acts on are reported: failures (with the
/// reason kind, so the caller can decide whether to rebind), reaching
/// streaming, and reaching closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Streaming,
    Closed,
    Failed(ErrorKind),
}

/// Event alphabet of the serialized session queue
///
/// Caller operations and platform completion callbacks all travel through
/// the same queue and are handled one at a time.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Caller requested a bind against the given viewport
    Bind(ViewportSize),
    /// Caller requested teardown
    Unbind,
    /// Platform finished opening the device
    DeviceOpened,
    /// Platform failed to open the device
    DeviceError(String),
    /// Platform finished building the capture session
    SessionConfigured,
    /// Platform failed to build the capture session
    SessionConfigFailed(String),
    /// Device was disconnected; forces teardown from any state
    DeviceDisconnected,
    /// Stop the event loop (controller shutdown)
    Shutdown,
}
