// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture host
//!
//! Linux implementation of [`CaptureHost`] backed by the kernel V4L2 API.
//! Discovery scans the device directory for video nodes and snapshots each
//! node's discrete capture sizes. Opening, format programming and the
//! autofocus control are real hardware calls; frame transport into the sink
//! is the renderer integration's job and stays outside this host.
//!
//! The V4L2 API is synchronous, so open and session-build completions are
//! posted to the event queue before the call returns. The serialized queue
//! makes that indistinguishable from a platform that calls back later.

use super::{CaptureHost, HostError, HostResult};
use crate::constants::{DEFAULT_PIXEL_FORMAT, STEPWISE_PROBE_SIZES};
use crate::session::controller::SessionEvents;
use crate::session::types::{CaptureSize, DeviceDescriptor, DeviceId, LensFacing, SinkTarget};
use serde::{Deserialize, Serialize};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use v4l::framesize::FrameSizeEnum;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

// ===== V4L2 control interface =====
// Control set goes through the raw ioctl; the ids follow the kernel uapi.

const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

/// Auto focus enable
pub const V4L2_CID_FOCUS_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 12;

/// Set control value (v4l2_control: 8 bytes)
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;

/// V4L2 control get/set structure
#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

/// Set a V4L2 control on the device at `path`
fn set_control(path: &str, control_id: u32, value: i32) -> Result<(), String> {
    let file =
        std::fs::File::open(path).map_err(|e| format!("Failed to open device: {}", e))?;
    let fd = file.as_raw_fd();

    let mut ctrl = V4l2Control {
        id: control_id,
        value,
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_S_CTRL, &mut ctrl as *mut V4l2Control) };
    if result < 0 {
        let errno = std::io::Error::last_os_error();
        return Err(format!("Failed to set control: {}", errno));
    }
    Ok(())
}

/// Configuration for the V4L2 host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V4l2HostConfig {
    /// Directory scanned for video device nodes
    pub device_dir: PathBuf,
    /// FourCC of the capture format to program (4 ASCII characters)
    pub pixel_format: String,
}

impl Default for V4l2HostConfig {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from("/dev"),
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
        }
    }
}

/// One open V4L2 device node
struct OpenDevice {
    device: Device,
    path: String,
}

/// V4L2-backed capture host
pub struct V4l2Host {
    config: V4l2HostConfig,
    open: Option<OpenDevice>,
    configured: bool,
    streaming: bool,
}

impl V4l2Host {
    pub fn new(config: V4l2HostConfig) -> Self {
        Self {
            config,
            open: None,
            configured: false,
            streaming: false,
        }
    }
}

impl Default for V4l2Host {
    fn default() -> Self {
        Self::new(V4l2HostConfig::default())
    }
}

impl CaptureHost for V4l2Host {
    fn list_devices(&mut self) -> Vec<DeviceDescriptor> {
        let entries = match std::fs::read_dir(&self.config.device_dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    dir = %self.config.device_dir.display(),
                    error = %err,
                    "Cannot scan for capture devices"
                );
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with("video"))
                    .unwrap_or(false)
            })
            .collect();
        // enumeration must be deterministic; directory order is not
        paths.sort();

        let mut devices = Vec::new();
        for path in paths {
            let path_str = path.to_string_lossy().to_string();
            let Ok(dev) = Device::with_path(&path) else {
                debug!(path = %path_str, "Skipping unopenable video node");
                continue;
            };

            let name = dev
                .query_caps()
                .map(|caps| caps.card)
                .unwrap_or_else(|_| path_str.clone());

            let supported_sizes = enumerate_sizes(&dev);
            if supported_sizes.is_empty() {
                // metadata and output nodes report no capture sizes
                debug!(path = %path_str, "Skipping node without capture sizes");
                continue;
            }

            devices.push(DeviceDescriptor {
                id: DeviceId::new(path_str),
                name,
                supported_sizes,
                facing: LensFacing::External,
            });
        }

        info!(count = devices.len(), "Enumerated V4L2 capture devices");
        devices
    }

    fn open_device(&mut self, device: &DeviceDescriptor, events: &SessionEvents) {
        match Device::with_path(device.id.as_str()) {
            Ok(dev) => {
                info!(device = %device.name, path = %device.id, "Opened V4L2 device");
                self.open = Some(OpenDevice {
                    device: dev,
                    path: device.id.as_str().to_string(),
                });
                events.device_opened();
            }
            Err(err) => {
                events.device_error(format!("{}: {}", device.id, err));
            }
        }
    }

    fn build_session(&mut self, target: SinkTarget, size: CaptureSize, events: &SessionEvents) {
        let Some(open) = &self.open else {
            events.session_config_failed("no open device");
            return;
        };
        let Some(fourcc) = fourcc_from_str(&self.config.pixel_format) else {
            events.session_config_failed(format!(
                "invalid pixel format {:?}",
                self.config.pixel_format
            ));
            return;
        };

        let format = Format::new(size.width, size.height, fourcc);
        match open.device.set_format(&format) {
            Ok(actual) => {
                if actual.width != size.width || actual.height != size.height {
                    warn!(
                        requested = %size,
                        got = format!("{}x{}", actual.width, actual.height),
                        "Driver adjusted the capture format"
                    );
                }
                debug!(sink_target = target.raw(), capture = %size, "Capture session configured");
                self.configured = true;
                events.session_configured();
            }
            Err(err) => {
                events.session_config_failed(format!("set_format: {}", err));
            }
        }
    }

    fn start_repeating(&mut self, continuous_autofocus: bool) -> HostResult<()> {
        let Some(open) = &self.open else {
            return Err(HostError::InvalidHandle("device"));
        };
        if !self.configured {
            return Err(HostError::InvalidHandle("session"));
        }

        if continuous_autofocus {
            // Not every webcam has a focus actuator; a missing control is
            // tolerated and logged, never fatal to the session.
            if let Err(err) = set_control(&open.path, V4L2_CID_FOCUS_AUTO, 1) {
                warn!(path = %open.path, error = %err, "Continuous autofocus not applied");
            }
        }

        self.streaming = true;
        Ok(())
    }

    fn stop_repeating(&mut self) -> HostResult<()> {
        if !self.streaming {
            return Err(HostError::InvalidHandle("repeating request"));
        }
        self.streaming = false;
        Ok(())
    }

    fn abort_captures(&mut self) -> HostResult<()> {
        if self.open.is_none() {
            return Err(HostError::InvalidHandle("device"));
        }
        debug!("No queued captures to abort");
        Ok(())
    }

    fn release_session(&mut self) -> HostResult<()> {
        if !self.configured {
            return Err(HostError::InvalidHandle("session"));
        }
        self.configured = false;
        Ok(())
    }

    fn release_device(&mut self) -> HostResult<()> {
        match self.open.take() {
            Some(open) => {
                info!(path = %open.path, "Released V4L2 device");
                Ok(())
            }
            None => Err(HostError::InvalidHandle("device")),
        }
    }
}

/// Snapshot the discrete capture sizes a device node offers.
///
/// Sizes are collected across all pixel formats in driver order, first
/// occurrence wins. Stepwise ranges are probed at the common resolutions.
fn enumerate_sizes(dev: &Device) -> Vec<CaptureSize> {
    let mut sizes: Vec<CaptureSize> = Vec::new();

    let Ok(format_descriptions) = dev.enum_formats() else {
        return sizes;
    };

    for desc in format_descriptions {
        let Ok(frame_sizes) = dev.enum_framesizes(desc.fourcc) else {
            continue;
        };
        for frame_size in frame_sizes {
            match frame_size.size {
                FrameSizeEnum::Discrete(discrete) => {
                    let size = CaptureSize::new(discrete.width, discrete.height);
                    if !sizes.contains(&size) {
                        sizes.push(size);
                    }
                }
                FrameSizeEnum::Stepwise(step) => {
                    for &(w, h) in STEPWISE_PROBE_SIZES.iter() {
                        if w >= step.min_width
                            && w <= step.max_width
                            && h >= step.min_height
                            && h <= step.max_height
                        {
                            let size = CaptureSize::new(w, h);
                            if !sizes.contains(&size) {
                                sizes.push(size);
                            }
                        }
                    }
                }
            }
        }
    }

    sizes
}

fn fourcc_from_str(s: &str) -> Option<FourCC> {
    let bytes = s.as_bytes();
    if bytes.len() != 4 {
        return None;
    }
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    Some(FourCC::new(&raw))
}
