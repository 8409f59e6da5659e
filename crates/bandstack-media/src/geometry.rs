//! Canvas-to-source coordinate mapping.
//!
//! The interactive editing canvas and the source frame may have different
//! aspect ratios; horizontal and vertical scale factors are intentionally
//! independent so the mapped region matches what the user visually selected.

use bandstack_models::Rect;

use crate::error::{MediaError, MediaResult};

/// Map a canvas-space rectangle into source-frame pixel coordinates.
///
/// Scale factors are `frame / canvas` per axis; each of x, y, width and
/// height is scaled and truncated toward zero, then the result is clamped
/// into `[0, frame_width) x [0, frame_height)` by shrinking width/height
/// (the origin is never shifted).
///
/// # Errors
///
/// `InvalidGeometry` when the canvas or frame has a zero dimension. This is
/// non-retryable; callers must abort setup.
pub fn map_to_frame(
    rect: Rect,
    canvas_size: (u32, u32),
    frame_size: (u32, u32),
) -> MediaResult<Rect> {
    let (canvas_w, canvas_h) = canvas_size;
    let (frame_w, frame_h) = frame_size;

    if canvas_w == 0 || canvas_h == 0 {
        return Err(MediaError::invalid_geometry(format!(
            "canvas has zero dimension: {}x{}",
            canvas_w, canvas_h
        )));
    }
    if frame_w == 0 || frame_h == 0 {
        return Err(MediaError::invalid_geometry(format!(
            "frame has zero dimension: {}x{}",
            frame_w, frame_h
        )));
    }

    let scale_x = frame_w as f64 / canvas_w as f64;
    let scale_y = frame_h as f64 / canvas_h as f64;

    // Truncation, not rounding: matches the editing surface's integer math.
    let scaled = Rect::new(
        (rect.x as f64 * scale_x) as u32,
        (rect.y as f64 * scale_y) as u32,
        (rect.width as f64 * scale_x) as u32,
        (rect.height as f64 * scale_y) as u32,
    );

    Ok(scaled.clamped_to(frame_w, frame_h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mapping() {
        let rect = Rect::new(10, 20, 300, 400);
        let mapped = map_to_frame(rect, (960, 540), (960, 540)).unwrap();
        assert_eq!(mapped, rect);
    }

    #[test]
    fn test_upscale_truncates() {
        // 960x540 canvas onto a 1920x1080 frame: every coordinate doubles
        let rect = Rect::new(100, 50, 300, 200);
        let mapped = map_to_frame(rect, (960, 540), (1920, 1080)).unwrap();
        assert_eq!(mapped, Rect::new(200, 100, 600, 400));
    }

    #[test]
    fn test_non_uniform_scale() {
        // Canvas and frame aspect ratios differ; axes scale independently
        let rect = Rect::new(100, 100, 100, 100);
        let mapped = map_to_frame(rect, (1000, 500), (2000, 2000)).unwrap();
        assert_eq!(mapped, Rect::new(200, 400, 200, 400));
    }

    #[test]
    fn test_result_contained_in_frame() {
        let rect = Rect::new(900, 500, 200, 100);
        let mapped = map_to_frame(rect, (960, 540), (1280, 720)).unwrap();
        assert!(mapped.x + mapped.width <= 1280);
        assert!(mapped.y + mapped.height <= 720);
    }

    #[test]
    fn test_zero_canvas_is_invalid_geometry() {
        let rect = Rect::new(0, 0, 100, 100);
        assert!(matches!(
            map_to_frame(rect, (0, 540), (1920, 1080)),
            Err(MediaError::InvalidGeometry(_))
        ));
        assert!(matches!(
            map_to_frame(rect, (960, 0), (1920, 1080)),
            Err(MediaError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_zero_frame_is_invalid_geometry() {
        let rect = Rect::new(0, 0, 100, 100);
        assert!(matches!(
            map_to_frame(rect, (960, 540), (0, 1080)),
            Err(MediaError::InvalidGeometry(_))
        ));
    }
}
