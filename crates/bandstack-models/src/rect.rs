use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in integer pixel units.
///
/// Used for both canvas-space (editing surface) and source-frame-space
/// regions. Zero width or height is a degenerate state that must be
/// rejected before cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    /// X coordinate of the top-left corner
    pub x: u32,
    /// Y coordinate of the top-left corner
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Check whether the rectangle has zero area.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clamp this rectangle to lie within `[0, frame_width) x [0, frame_height)`.
    ///
    /// Width and height are shrunk as needed; the origin is never shifted.
    /// The result may be degenerate when the rectangle lies fully outside
    /// the frame.
    pub fn clamped_to(&self, frame_width: u32, frame_height: u32) -> Rect {
        let x = self.x.min(frame_width);
        let y = self.y.min(frame_height);
        Rect {
            x,
            y,
            width: self.width.min(frame_width - x),
            height: self.height.min(frame_height - y),
        }
    }
}

/// Origin tag for a region in the pair. Carries no top/bottom semantics;
/// stacking order is decided by [`RegionPair::stacked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RegionTag {
    RegionA,
    RegionB,
}

/// The two user-selected crop regions, in source-frame pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegionPair {
    /// First-supplied region
    pub a: Rect,
    /// Second-supplied region
    pub b: Rect,
}

impl RegionPair {
    /// Create a pair from the two supplied regions.
    pub fn new(a: Rect, b: Rect) -> Self {
        Self { a, b }
    }

    /// Resolve stacking order: the region with the smaller height becomes
    /// the top band. Equal heights deterministically put the
    /// second-supplied region (B) on the bottom.
    pub fn stacked(&self) -> (Rect, Rect) {
        if self.b.height < self.a.height {
            (self.b, self.a)
        } else {
            (self.a, self.b)
        }
    }

    /// Stacking order with origin tags, top first.
    pub fn stacked_tagged(&self) -> ((Rect, RegionTag), (Rect, RegionTag)) {
        if self.b.height < self.a.height {
            ((self.b, RegionTag::RegionB), (self.a, RegionTag::RegionA))
        } else {
            ((self.a, RegionTag::RegionA), (self.b, RegionTag::RegionB))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_shrinks_without_shifting_origin() {
        let rect = Rect::new(1800, 1000, 400, 300);
        let clamped = rect.clamped_to(1920, 1080);
        assert_eq!(clamped.x, 1800);
        assert_eq!(clamped.y, 1000);
        assert_eq!(clamped.width, 120);
        assert_eq!(clamped.height, 80);
    }

    #[test]
    fn test_clamp_fully_outside_is_degenerate() {
        let rect = Rect::new(3000, 2000, 100, 100);
        let clamped = rect.clamped_to(1920, 1080);
        assert!(clamped.is_degenerate());
    }

    #[test]
    fn test_smaller_height_is_top() {
        let small = Rect::new(0, 0, 300, 100);
        let large = Rect::new(0, 0, 300, 500);

        let (top, bottom) = RegionPair::new(small, large).stacked();
        assert_eq!(top, small);
        assert_eq!(bottom, large);

        // Swapping the supply order does not change which region is on top
        let (top, bottom) = RegionPair::new(large, small).stacked();
        assert_eq!(top, small);
        assert_eq!(bottom, large);
    }

    #[test]
    fn test_equal_heights_put_b_on_bottom() {
        let a = Rect::new(0, 0, 300, 200);
        let b = Rect::new(100, 100, 400, 200);

        for _ in 0..3 {
            let ((top, top_tag), (_, bottom_tag)) = RegionPair::new(a, b).stacked_tagged();
            assert_eq!(top, a);
            assert_eq!(top_tag, RegionTag::RegionA);
            assert_eq!(bottom_tag, RegionTag::RegionB);
        }
    }

    #[test]
    fn test_degenerate_detection() {
        assert!(Rect::new(0, 0, 100, 0).is_degenerate());
        assert!(Rect::new(0, 0, 0, 100).is_degenerate());
        assert!(!Rect::new(0, 0, 1, 1).is_degenerate());
    }
}
