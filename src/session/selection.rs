// SPDX-License-Identifier: GPL-3.0-only

//! Capture size selection for a target viewport

use super::types::{CaptureSize, ViewportSize};
use crate::errors::{SessionError, SessionResult};
use tracing::info;

/// Select the capture size best matched to the viewport.
///
/// Candidates that can fully cover the viewport without upscaling (both
/// dimensions strictly larger, swapped for a portrait viewport) are
/// preferred; among them the one whose squared height sits closest to the
/// viewport's pixel area wins. When nothing covers the viewport, the overall
/// largest size is used instead. Ties go to the earlier entry, so driver
/// ordering is preserved.
///
/// The returned size is always a member of `available`. An empty `available`
/// is a caller contract violation, not a selectable condition.
pub fn optimal_capture_size(
    available: &[CaptureSize],
    viewport: ViewportSize,
) -> SessionResult<CaptureSize> {
    if available.is_empty() {
        return Err(SessionError::ContractViolation(
            "capture size list is empty".to_string(),
        ));
    }

    let covering: Vec<CaptureSize> = available
        .iter()
        .copied()
        .filter(|size| covers_viewport(*size, viewport))
        .collect();

    if !covering.is_empty() {
        let target_area = viewport.area() as i64;
        // min_by_key keeps the first of equally-close candidates
        let best = covering
            .iter()
            .copied()
            .min_by_key(|size| (i64::from(size.height) * i64::from(size.height) - target_area).abs());

        if let Some(size) = best {
            info!(
                selected = %size,
                viewport = %viewport,
                candidates = covering.len(),
                "Selected covering capture size"
            );
            return Ok(size);
        }
    }

    // Nothing covers the viewport; fall back to the largest size overall.
    // find() keeps the first of equally-large candidates.
    let max_area = available.iter().map(|size| size.area()).max().unwrap_or(0);
    let fallback = available
        .iter()
        .copied()
        .find(|size| size.area() == max_area)
        .unwrap_or(available[0]);

    info!(
        selected = %fallback,
        viewport = %viewport,
        "No capture size covers the viewport, using maximum area"
    );
    Ok(fallback)
}

/// Check whether a capture size can fill the viewport without upscaling.
///
/// For a portrait viewport the comparison axes are swapped, since capture
/// sizes are reported in sensor (landscape) orientation.
fn covers_viewport(size: CaptureSize, viewport: ViewportSize) -> bool {
    if viewport.is_landscape() {
        size.width > viewport.width && size.height > viewport.height
    } else {
        size.width > viewport.height && size.height > viewport.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(list: &[(u32, u32)]) -> Vec<CaptureSize> {
        list.iter().map(|&(w, h)| CaptureSize::new(w, h)).collect()
    }

    #[test]
    fn test_empty_list_is_a_contract_violation() {
        let result = optimal_capture_size(&[], ViewportSize::new(800, 480));
        assert!(matches!(result, Err(SessionError::ContractViolation(_))));
    }

    #[test]
    fn test_result_is_member_of_available() {
        let available = sizes(&[(1920, 1080), (1280, 720), (640, 480)]);
        for viewport in [
            ViewportSize::new(800, 480),
            ViewportSize::new(480, 800),
            ViewportSize::new(4000, 3000),
            ViewportSize::new(1, 1),
        ] {
            let picked = optimal_capture_size(&available, viewport).unwrap();
            assert!(available.contains(&picked), "{} not in available", picked);
        }
    }

    #[test]
    fn test_landscape_viewport_picks_closest_covering_size() {
        // Covering subset is {1920x1080, 1280x720}; 720^2 is much closer to
        // 800*480 than 1080^2, so 1280x720 wins.
        let available = sizes(&[(1920, 1080), (1280, 720), (640, 480)]);
        let picked = optimal_capture_size(&available, ViewportSize::new(800, 480)).unwrap();
        assert_eq!(picked, CaptureSize::new(1280, 720));
    }

    #[test]
    fn test_covering_size_preferred_over_larger_noncovering() {
        let available = sizes(&[(640, 480), (1280, 720)]);
        let picked = optimal_capture_size(&available, ViewportSize::new(800, 480)).unwrap();
        assert_eq!(picked, CaptureSize::new(1280, 720));
    }

    #[test]
    fn test_portrait_viewport_swaps_comparison_axes() {
        // 480x800 portrait viewport: a size covers it when width > 800 and
        // height > 480, so 640x480 and 800x600 are out.
        let available = sizes(&[(640, 480), (800, 600), (1280, 720)]);
        let picked = optimal_capture_size(&available, ViewportSize::new(480, 800)).unwrap();
        assert_eq!(picked, CaptureSize::new(1280, 720));
    }

    #[test]
    fn test_falls_back_to_maximum_area_when_nothing_covers() {
        let available = sizes(&[(640, 480), (1280, 720), (320, 240)]);
        let picked = optimal_capture_size(&available, ViewportSize::new(1920, 1200)).unwrap();
        assert_eq!(picked, CaptureSize::new(1280, 720));
    }

    #[test]
    fn test_fallback_tie_keeps_first_encountered() {
        // 800x600 and 600x800 have equal area; the earlier entry wins.
        let available = sizes(&[(800, 600), (600, 800)]);
        let picked = optimal_capture_size(&available, ViewportSize::new(4000, 3000)).unwrap();
        assert_eq!(picked, CaptureSize::new(800, 600));
    }

    #[test]
    fn test_covering_tie_keeps_first_encountered() {
        // Same height means the same distance metric; the earlier entry wins.
        let available = sizes(&[(1280, 720), (1290, 720)]);
        let picked = optimal_capture_size(&available, ViewportSize::new(800, 480)).unwrap();
        assert_eq!(picked, CaptureSize::new(1280, 720));
    }

    #[test]
    fn test_square_viewport_is_treated_as_portrait() {
        // width == height is not landscape, so the swapped comparison applies
        let available = sizes(&[(1280, 720), (720, 1280)]);
        let picked = optimal_capture_size(&available, ViewportSize::new(700, 700)).unwrap();
        // 1280x720: width 1280 > 700 and height 720 > 700, covering
        assert_eq!(picked, CaptureSize::new(1280, 720));
    }
}
