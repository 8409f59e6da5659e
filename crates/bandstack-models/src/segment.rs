//! Segment (part) descriptors and lifecycle.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed duration of one output part, in seconds.
pub const PART_DURATION_SECS: f64 = 180.0;

/// Name of the transient subdirectory holding silent intermediates.
pub const TEMP_PARTS_DIR: &str = "temp_parts";

/// Number of frames per full part for a given source frame rate.
///
/// Always at least 1 so that pathological frame rates cannot produce a
/// zero-length rollover threshold.
pub fn frames_per_part(part_duration_secs: f64, fps: f64) -> u64 {
    (part_duration_secs * fps).round().max(1.0) as u64
}

/// Deterministic file name for a finalized part (1-based).
pub fn part_file_name(part_number: u32) -> String {
    format!("part_{}.mp4", part_number)
}

/// Lifecycle of a segment.
///
/// Every `Open` segment ends up either `Closed` then `Finalized`, or
/// `Discarded`; no silent intermediate survives a completed or aborted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SegmentState {
    /// Frames are being appended
    Open,
    /// Silent video file closed and flushed, audio not yet attached
    Closed,
    /// Audio merged, delivery-ready part exists in the output directory
    Finalized,
    /// Removed without finalization (cancel or zero-frame close)
    Discarded,
}

/// A closed segment, ready for audio finalization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SegmentDescriptor {
    /// 1-based part number, contiguous across a run
    pub part_number: u32,
    /// Start offset of this part within the source, in seconds
    pub start_secs: f64,
    /// Number of frames written to the silent intermediate
    pub frame_count: u64,
    /// Path of the silent intermediate file
    pub silent_path: PathBuf,
}

impl SegmentDescriptor {
    /// Start offset for a part number under the fixed part duration.
    pub fn start_for(part_number: u32, part_duration_secs: f64) -> f64 {
        (part_number.saturating_sub(1)) as f64 * part_duration_secs
    }
}
