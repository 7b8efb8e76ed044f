// SPDX-License-Identifier: MPL-2.0

//! Viewfinder - capture device lifecycle for live preview
//!
//! This library binds a video capture device to a caller-owned render
//! surface: it discovers a device, negotiates the capture resolution against
//! the surface's viewport, opens the device, maps the stream onto the
//! surface with a center-fill transform, starts a continuous-autofocus
//! repeating capture request, and tears everything down in a fixed order on
//! demand or on disconnect.
//!
//! # Architecture
//!
//! The crate is organized into a few modules:
//!
//! - [`session`]: state machine, controller, size selection and transform
//! - [`host`]: the platform capture port and its Linux V4L2 implementation
//! - [`config`]: session behavior configuration
//! - [`errors`]: error types shared across the crate
//!
//! # Example
//!
//! ```ignore
//! let host = Box::new(V4l2Host::default());
//! let controller = SessionController::new(host, sink, SessionConfig::default());
//! controller.bind(ViewportSize::new(800, 480))?;
//! // later, when the surface goes away or the user leaves:
//! controller.unbind();
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod host;
pub mod session;

// Re-export commonly used types
pub use config::SessionConfig;
pub use errors::{ErrorKind, SessionError, SessionResult};
pub use host::{CaptureHost, HostError, HostResult, V4l2Host, V4l2HostConfig};
pub use session::{
    CaptureSize, DeviceDescriptor, DeviceId, FrameSink, LensFacing, SessionController,
    SessionEvents, SessionState, SinkTarget, StateChange, Transform, ViewportSize,
};
