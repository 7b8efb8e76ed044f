// SPDX-License-Identifier: GPL-3.0-only

//! Center-fill transform from capture space onto the viewport

use super::types::{CaptureSize, Transform, ViewportSize};

/// Compute the transform that maps the captured frame onto the viewport.
///
/// The capture image is scaled uniformly in aspect so that one axis exactly
/// fills the viewport, then centered. The other axis may overflow past the
/// viewport edges; this is a fill mapping, not a letterbox. The translation
/// is in viewport coordinates and is applied before the scale.
///
/// Both sizes must have positive dimensions; the caller validates the
/// viewport before a session reaches this point.
pub fn center_fill_transform(capture: CaptureSize, viewport: ViewportSize) -> Transform {
    debug_assert!(capture.width > 0 && capture.height > 0);
    debug_assert!(viewport.width > 0 && viewport.height > 0);

    // Ratio comparison works on the landscape-normalized capture dimensions;
    // the output still targets the viewport as given.
    let (cap_w, cap_h) = if capture.width >= capture.height {
        (capture.width as f32, capture.height as f32)
    } else {
        (capture.height as f32, capture.width as f32)
    };

    let view_w = viewport.width as f32;
    let view_h = viewport.height as f32;

    let width_ratio = cap_w / view_w;
    let height_ratio = cap_h / view_h;

    let (fit_w, fit_h) = if width_ratio > height_ratio {
        // Width reaches the viewport edge first
        (view_w, view_w * cap_h / cap_w)
    } else {
        // Height reaches the viewport edge first
        (view_h * cap_w / cap_h, view_h)
    };

    Transform {
        scale_x: fit_w / view_w,
        scale_y: fit_h / view_h,
        translate_x: (view_w - fit_w) / 2.0,
        translate_y: (view_h - fit_h) / 2.0,
    }
}
