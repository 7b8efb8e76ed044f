// SPDX-License-Identifier: GPL-3.0-only

//! Crate-wide constants

/// Discrete sizes probed when a driver only reports a stepwise size range
pub const STEPWISE_PROBE_SIZES: [(u32, u32); 4] =
    [(1920, 1080), (1280, 720), (800, 600), (640, 480)];

/// FourCC of the capture format programmed on the device by default
pub const DEFAULT_PIXEL_FORMAT: &str = "YUYV";
