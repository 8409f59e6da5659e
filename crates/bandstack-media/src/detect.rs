//! Initial region suggestion.
//!
//! Face/pose inference itself is an external capability; the pipeline only
//! needs one suggested rectangle for the first frame at setup time. The
//! detector is an explicitly owned instance passed by reference into the
//! one-shot call, not a process-wide singleton.

use async_trait::async_trait;

use bandstack_models::Rect;

use crate::error::MediaResult;
use crate::frames::Frame;

/// One-shot region suggestion capability.
#[async_trait]
pub trait RegionDetector: Send + Sync {
    /// Suggest an initial crop region for a frame, if a subject is found.
    async fn suggest_region(&self, frame: &Frame) -> MediaResult<Option<Rect>>;
}

/// Detector that never suggests a region; callers keep their defaults.
pub struct NullDetector;

#[async_trait]
impl RegionDetector for NullDetector {
    async fn suggest_region(&self, _frame: &Frame) -> MediaResult<Option<Rect>> {
        Ok(None)
    }
}

/// Run the detector against a frame and clamp any suggestion to the frame
/// bounds, dropping degenerate results.
pub async fn suggest_initial_region(
    detector: &dyn RegionDetector,
    frame: &Frame,
) -> MediaResult<Option<Rect>> {
    let (width, height) = frame.pixels.dimensions();
    Ok(detector
        .suggest_region(frame)
        .await?
        .map(|r| r.clamped_to(width, height))
        .filter(|r| !r.is_degenerate()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct FixedDetector(Rect);

    #[async_trait]
    impl RegionDetector for FixedDetector {
        async fn suggest_region(&self, _frame: &Frame) -> MediaResult<Option<Rect>> {
            Ok(Some(self.0))
        }
    }

    fn frame(width: u32, height: u32) -> Frame {
        Frame {
            index: 0,
            pixels: RgbImage::new(width, height),
        }
    }

    #[tokio::test]
    async fn test_null_detector_suggests_nothing() {
        let suggestion = suggest_initial_region(&NullDetector, &frame(64, 64))
            .await
            .unwrap();
        assert!(suggestion.is_none());
    }

    #[tokio::test]
    async fn test_suggestion_is_clamped() {
        let detector = FixedDetector(Rect::new(50, 50, 100, 100));
        let suggestion = suggest_initial_region(&detector, &frame(64, 64))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(suggestion, Rect::new(50, 50, 14, 14));
    }

    #[tokio::test]
    async fn test_out_of_frame_suggestion_is_dropped() {
        let detector = FixedDetector(Rect::new(200, 200, 10, 10));
        let suggestion = suggest_initial_region(&detector, &frame(64, 64))
            .await
            .unwrap();
        assert!(suggestion.is_none());
    }
}
