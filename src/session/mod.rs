// SPDX-License-Identifier: MPL-2.0

//! Capture session core
//!
//! One bound device, one active session, one owner. The controller serializes
//! caller operations and platform callbacks onto a single worker thread; the
//! machine behind it holds the device and session resources and walks them
//! through open, configure, stream and the fixed teardown order.

pub mod controller;
pub mod machine;
pub mod selection;
pub mod transform;
pub mod types;

pub use controller::{SessionController, SessionEvents};
pub use selection::optimal_capture_size;
pub use transform::center_fill_transform;
pub use types::*;

/// Destination surface the session streams frames into
///
/// Created and destroyed by the caller; the session core only borrows it.
/// The core applies the viewport transform, hands the sink's opaque target
/// to the platform when building the session, and detaches during teardown.
/// It never destroys the sink. The caller must not mutate or destroy the
/// sink while a session is configuring or streaming.
///
/// All methods are invoked from the session worker thread.
pub trait FrameSink: Send + Sync {
    /// Apply the transform mapping capture pixels onto the viewport.
    ///
    /// Called before the capture session is built, and again if a later bind
    /// negotiates a different capture size or viewport.
    fn set_transform(&self, transform: Transform);

    /// The opaque handle the platform resolves to its writable frame target
    fn capture_target(&self) -> SinkTarget;

    /// Drop any association with the session; called last during teardown
    fn detach(&self);
}
