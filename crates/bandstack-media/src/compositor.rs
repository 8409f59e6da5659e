//! Two-band vertical compositor.
//!
//! Crops the two user regions out of a source frame, resizes each to its
//! allocated share of the portrait output and stacks them vertically. This
//! is the per-frame hot path; the function is pure given its inputs.

use image::imageops::{self, FilterType};
use image::RgbImage;

use bandstack_models::{Rect, RegionPair};

use crate::frames::Frame;

/// Compositor producing frames of a fixed output size.
#[derive(Debug, Clone, Copy)]
pub struct BandCompositor {
    out_width: u32,
    out_height: u32,
}

/// Output height allocation for the two bands.
///
/// The top band gets `round(out_height * top / (top + bottom))`; the bottom
/// band takes the remainder, so the two always sum exactly to `out_height`.
pub fn band_heights(top_height: u32, bottom_height: u32, out_height: u32) -> (u32, u32) {
    let total = top_height as f64 + bottom_height as f64;
    let top = (out_height as f64 * top_height as f64 / total).round() as u32;
    let top = top.min(out_height);
    (top, out_height - top)
}

impl BandCompositor {
    /// Create a compositor for the given output size.
    pub fn new(out_width: u32, out_height: u32) -> Self {
        Self {
            out_width,
            out_height,
        }
    }

    /// Output dimensions (width, height).
    pub fn output_size(&self) -> (u32, u32) {
        (self.out_width, self.out_height)
    }

    /// Composite one frame, or `None` when the frame is skipped.
    ///
    /// The region with the smaller height becomes the top band. Both
    /// rectangles are re-clamped against the frame bounds; if either crop
    /// is left with zero area the whole frame is skipped. Skips are not
    /// errors: the frame is silently dropped from the output.
    pub fn composite(&self, frame: &Frame, regions: &RegionPair) -> Option<RgbImage> {
        let (frame_w, frame_h) = frame.pixels.dimensions();

        let (top_rect, bottom_rect) = regions.stacked();
        let top_rect = top_rect.clamped_to(frame_w, frame_h);
        let bottom_rect = bottom_rect.clamped_to(frame_w, frame_h);

        if top_rect.is_degenerate() || bottom_rect.is_degenerate() {
            return None;
        }

        let (top_out_h, bottom_out_h) =
            band_heights(top_rect.height, bottom_rect.height, self.out_height);

        let top_band = self.render_band(&frame.pixels, &top_rect, top_out_h);
        let bottom_band = self.render_band(&frame.pixels, &bottom_rect, bottom_out_h);

        let row_bytes = self.out_width as usize * 3;
        let mut combined = Vec::with_capacity(row_bytes * self.out_height as usize);
        combined.extend_from_slice(top_band.as_raw());
        combined.extend_from_slice(bottom_band.as_raw());

        RgbImage::from_raw(self.out_width, self.out_height, combined)
    }

    fn render_band(&self, pixels: &RgbImage, rect: &Rect, out_height: u32) -> RgbImage {
        let crop = imageops::crop_imm(pixels, rect.x, rect.y, rect.width, rect.height);
        imageops::resize(
            &crop.to_image(),
            self.out_width,
            out_height,
            FilterType::Triangle,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        Frame {
            index: 0,
            pixels: RgbImage::from_pixel(width, height, image::Rgb(rgb)),
        }
    }

    #[test]
    fn test_band_heights_sum_exactly() {
        for (top, bottom) in [(100, 500), (1, 999), (333, 334), (200, 200), (7, 3)] {
            let (t, b) = band_heights(top, bottom, 1920);
            assert_eq!(t + b, 1920, "top={} bottom={}", top, bottom);
        }
    }

    #[test]
    fn test_band_heights_proportional() {
        let (t, b) = band_heights(100, 300, 1920);
        assert_eq!(t, 480);
        assert_eq!(b, 1440);
    }

    #[test]
    fn test_composite_output_size() {
        let compositor = BandCompositor::new(108, 192);
        let frame = solid_frame(640, 360, [10, 20, 30]);
        let regions = RegionPair::new(Rect::new(0, 0, 200, 100), Rect::new(0, 100, 200, 200));

        let combined = compositor.composite(&frame, &regions).unwrap();
        assert_eq!(combined.dimensions(), (108, 192));
    }

    #[test]
    fn test_smaller_region_lands_on_top() {
        let compositor = BandCompositor::new(100, 200);
        let mut pixels = RgbImage::from_pixel(400, 400, image::Rgb([0, 0, 255]));
        // Paint the small region red so we can find it in the output
        for y in 0..50 {
            for x in 0..100 {
                pixels.put_pixel(x, y, image::Rgb([255, 0, 0]));
            }
        }
        let frame = Frame { index: 0, pixels };

        // Small red region supplied second: must still end up on top
        let regions = RegionPair::new(
            Rect::new(0, 100, 100, 300), // blue, taller
            Rect::new(0, 0, 100, 50),    // red, shorter
        );
        let combined = compositor.composite(&frame, &regions).unwrap();
        let top_pixel = combined.get_pixel(50, 0);
        let bottom_pixel = combined.get_pixel(50, 199);
        assert!(top_pixel[0] > top_pixel[2], "top band should be red");
        assert!(bottom_pixel[2] > bottom_pixel[0], "bottom band should be blue");
    }

    #[test]
    fn test_zero_height_region_skips_frame() {
        let compositor = BandCompositor::new(100, 200);
        let frame = solid_frame(400, 400, [1, 2, 3]);
        let regions = RegionPair::new(Rect::new(0, 0, 100, 0), Rect::new(0, 0, 100, 100));
        assert!(compositor.composite(&frame, &regions).is_none());
    }

    #[test]
    fn test_region_outside_frame_skips_frame() {
        let compositor = BandCompositor::new(100, 200);
        let frame = solid_frame(400, 400, [1, 2, 3]);
        let regions = RegionPair::new(
            Rect::new(500, 500, 100, 100), // fully outside
            Rect::new(0, 0, 100, 100),
        );
        assert!(compositor.composite(&frame, &regions).is_none());
    }

    #[test]
    fn test_partially_outside_region_is_clamped_not_skipped() {
        let compositor = BandCompositor::new(100, 200);
        let frame = solid_frame(400, 400, [1, 2, 3]);
        let regions = RegionPair::new(
            Rect::new(350, 350, 100, 100), // overhangs the frame edge
            Rect::new(0, 0, 100, 200),
        );
        assert!(compositor.composite(&frame, &regions).is_some());
    }
}
