// SPDX-License-Identifier: MPL-2.0

//! Error types for capture session management

use std::fmt;

/// Result type alias using SessionError
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the capture session core
#[derive(Debug, Clone)]
pub enum SessionError {
    /// No candidate device was found, or the device cannot be accessed
    DeviceUnavailable(String),
    /// The platform reported a failure while opening the device
    DeviceOpenFailed(String),
    /// The platform reported a failure while configuring the capture session
    SessionConfigFailed(String),
    /// The device was disconnected while in use
    DeviceDisconnected,
    /// The supplied viewport has zero area
    InvalidViewport,
    /// Illegal call ordering or precondition breach; not recoverable
    ContractViolation(String),
}

/// Payload-free classification of a [`SessionError`]
///
/// Rides inside state snapshots and state-change notifications so those stay
/// `Copy`; the full error with its reason string is logged at the failure
/// site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DeviceUnavailable,
    DeviceOpenFailed,
    SessionConfigFailed,
    DeviceDisconnected,
    InvalidViewport,
    ContractViolation,
}

impl SessionError {
    /// Get the payload-free kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            SessionError::DeviceOpenFailed(_) => ErrorKind::DeviceOpenFailed,
            SessionError::SessionConfigFailed(_) => ErrorKind::SessionConfigFailed,
            SessionError::DeviceDisconnected => ErrorKind::DeviceDisconnected,
            SessionError::InvalidViewport => ErrorKind::InvalidViewport,
            SessionError::ContractViolation(_) => ErrorKind::ContractViolation,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            SessionError::DeviceOpenFailed(msg) => write!(f, "Device open failed: {}", msg),
            SessionError::SessionConfigFailed(msg) => {
                write!(f, "Session configuration failed: {}", msg)
            }
            SessionError::DeviceDisconnected => write!(f, "Device disconnected"),
            SessionError::InvalidViewport => write!(f, "Viewport has zero area"),
            SessionError::ContractViolation(msg) => write!(f, "Contract violation: {}", msg),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::DeviceUnavailable => write!(f, "device unavailable"),
            ErrorKind::DeviceOpenFailed => write!(f, "device open failed"),
            ErrorKind::SessionConfigFailed => write!(f, "session configuration failed"),
            ErrorKind::DeviceDisconnected => write!(f, "device disconnected"),
            ErrorKind::InvalidViewport => write!(f, "invalid viewport"),
            ErrorKind::ContractViolation => write!(f, "contract violation"),
        }
    }
}

impl std::error::Error for SessionError {}
