//! Shared data models for the bandstack reframing pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Pixel-space rectangles and the two-band region pair
//! - Encoding configuration and portrait output constants
//! - Segment (part) descriptors and lifecycle
//! - Run state and outcome reporting

pub mod encoding;
pub mod rect;
pub mod run;
pub mod segment;

// Re-export common types
pub use encoding::{EncodingConfig, PORTRAIT_HEIGHT, PORTRAIT_WIDTH};
pub use rect::{Rect, RegionPair, RegionTag};
pub use run::{RunOutcome, RunStatus};
pub use segment::{
    frames_per_part, part_file_name, SegmentDescriptor, SegmentState, PART_DURATION_SECS,
    TEMP_PARTS_DIR,
};
