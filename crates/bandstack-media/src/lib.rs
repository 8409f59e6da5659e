#![deny(unreachable_patterns)]
//! FFmpeg subprocess layer and per-frame compositing for bandstack.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with cancellation
//! - ffprobe-based source inspection
//! - Streaming rgb24 frame I/O over FFmpeg pipes
//! - Canvas-to-source geometry mapping
//! - Two-band vertical compositing (the per-frame hot path)
//! - Segment rollover, audio re-muxing and temp cleanup
//! - yt-dlp download helpers and the region-detector capability

pub mod command;
pub mod compositor;
pub mod detect;
pub mod download;
pub mod error;
pub mod frames;
pub mod geometry;
pub mod probe;
pub mod remux;
pub mod segment;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use compositor::{band_heights, BandCompositor};
pub use detect::{suggest_initial_region, NullDetector, RegionDetector};
pub use download::{download_clip, resolve_direct_url, sanitize_file_name};
pub use error::{MediaError, MediaResult};
pub use frames::{Frame, FrameSink, FrameSource, RawFrameSink, RawFrameSource};
pub use geometry::map_to_frame;
pub use probe::{get_duration, probe_video, VideoInfo};
pub use remux::{chunk_count, merge_audio, split_into_parts};
pub use segment::{FinalizeReport, PartStore, SegmentStore, SegmentWriter};
