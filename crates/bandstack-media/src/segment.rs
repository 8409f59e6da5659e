//! Time-bounded segment management.
//!
//! [`SegmentWriter`] owns the rollover bookkeeping: it opens a new part
//! when none is open, closes it once the frame threshold is reached and
//! hands the closed silent file to the store for audio finalization.
//! [`PartStore`] is the production store backed by FFmpeg; tests substitute
//! an in-memory store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;
use tracing::{info, warn};

use bandstack_models::{
    part_file_name, EncodingConfig, SegmentDescriptor, SegmentState, TEMP_PARTS_DIR,
};

use crate::error::{MediaError, MediaResult};
use crate::frames::{FrameSink, RawFrameSink};
use crate::remux;

/// Storage backend for segments: silent sinks, audio finalization, cleanup.
#[async_trait]
pub trait SegmentStore: Send {
    /// Path of the silent intermediate for a part.
    fn silent_path(&self, part_number: u32) -> PathBuf;

    /// Open a sink for a new silent part file.
    async fn open_part(&mut self, part_number: u32) -> MediaResult<Box<dyn FrameSink>>;

    /// Attach the matching audio slice to a closed part, returning the
    /// finalized path. The silent intermediate is consumed on success.
    async fn finalize_part(&mut self, segment: &SegmentDescriptor) -> MediaResult<PathBuf>;

    /// Remove the temporary directory and any leftover intermediates.
    async fn cleanup(&mut self) -> MediaResult<()>;
}

/// Result of closing one segment.
#[derive(Debug)]
pub struct FinalizeReport {
    /// The closed segment
    pub descriptor: SegmentDescriptor,
    /// Finalized part path, or `None` when the audio merge failed
    pub final_path: Option<PathBuf>,
    /// `Finalized` when the part has audio attached, `Closed` when the
    /// silent intermediate was left behind by a failed merge
    pub state: SegmentState,
}

struct OpenSegment {
    sink: Box<dyn FrameSink>,
    part_number: u32,
    frame_count: u64,
}

/// Writer managing the sequence of time-bounded output parts.
pub struct SegmentWriter<S: SegmentStore> {
    store: S,
    frames_per_part: u64,
    part_duration_secs: f64,
    current: Option<OpenSegment>,
    next_part: u32,
    parts_finalized: u32,
    audio_merge_failures: u32,
    frames_appended: u64,
}

impl<S: SegmentStore> SegmentWriter<S> {
    /// Create a writer. `frames_per_part` must be at least 1.
    pub fn new(store: S, frames_per_part: u64, part_duration_secs: f64) -> Self {
        Self {
            store,
            frames_per_part: frames_per_part.max(1),
            part_duration_secs,
            current: None,
            next_part: 1,
            parts_finalized: 0,
            audio_merge_failures: 0,
            frames_appended: 0,
        }
    }

    /// Append one composited frame to the current part, opening a new part
    /// if none is open. Returns a report when the append filled the part
    /// and triggered a rollover.
    pub async fn append(&mut self, pixels: &RgbImage) -> MediaResult<Option<FinalizeReport>> {
        if self.current.is_none() {
            let part_number = self.next_part;
            let sink = self.store.open_part(part_number).await?;
            self.next_part += 1;
            self.current = Some(OpenSegment {
                sink,
                part_number,
                frame_count: 0,
            });
        }

        let segment = self
            .current
            .as_mut()
            .ok_or_else(|| MediaError::internal("no open segment"))?;
        segment.sink.append(pixels).await?;
        segment.frame_count += 1;
        self.frames_appended += 1;

        if segment.frame_count >= self.frames_per_part {
            return Ok(self.close_current().await?.into());
        }
        Ok(None)
    }

    /// Close the trailing partial segment at end of input, if any.
    ///
    /// A segment that received zero frames is discarded, never finalized.
    pub async fn finish(&mut self) -> MediaResult<Option<FinalizeReport>> {
        match self.current.take() {
            None => Ok(None),
            Some(segment) if segment.frame_count == 0 => {
                if let Err(e) = segment.sink.abort().await {
                    warn!("Failed to discard empty segment: {}", e);
                }
                Ok(None)
            }
            Some(segment) => {
                self.current = Some(segment);
                Ok(Some(self.close_current().await?))
            }
        }
    }

    /// Discard the in-progress segment without finalizing it.
    ///
    /// Used on cancellation: the incomplete part's silent file is removed
    /// and the frames it held are dropped from the accounting of finalized
    /// output (they remain counted in `frames_appended`).
    pub async fn discard_open(&mut self) -> MediaResult<u64> {
        match self.current.take() {
            None => Ok(0),
            Some(segment) => {
                let dropped = segment.frame_count;
                segment.sink.abort().await?;
                info!(
                    "Discarded incomplete part {} ({} frames)",
                    segment.part_number, dropped
                );
                Ok(dropped)
            }
        }
    }

    /// Best-effort removal of the temporary directory. Failure is logged,
    /// never fatal.
    pub async fn cleanup(&mut self) {
        if let Err(e) = self.store.cleanup().await {
            warn!("Temp cleanup failed: {}", e);
        }
    }

    /// Whether a segment is currently open.
    pub fn has_open(&self) -> bool {
        self.current.is_some()
    }

    /// Frames appended across all segments, including any later discarded.
    pub fn frames_appended(&self) -> u64 {
        self.frames_appended
    }

    /// Parts finalized with audio attached.
    pub fn parts_finalized(&self) -> u32 {
        self.parts_finalized
    }

    /// Parts whose finalization failed (non-fatal).
    pub fn audio_merge_failures(&self) -> u32 {
        self.audio_merge_failures
    }

    async fn close_current(&mut self) -> MediaResult<FinalizeReport> {
        let segment = self
            .current
            .take()
            .ok_or_else(|| MediaError::internal("no open segment to close"))?;

        let descriptor = SegmentDescriptor {
            part_number: segment.part_number,
            start_secs: SegmentDescriptor::start_for(segment.part_number, self.part_duration_secs),
            frame_count: segment.frame_count,
            silent_path: self.store.silent_path(segment.part_number),
        };

        // The finalize call only begins once the silent file is fully
        // closed and flushed.
        if let Err(e) = segment.sink.finish().await {
            warn!(
                "Failed to close silent part {}: {}",
                descriptor.part_number, e
            );
            self.audio_merge_failures += 1;
            return Ok(FinalizeReport {
                descriptor,
                final_path: None,
                state: SegmentState::Closed,
            });
        }

        match self.store.finalize_part(&descriptor).await {
            Ok(final_path) => {
                self.parts_finalized += 1;
                info!(
                    "Part {} finalized: {} ({} frames)",
                    descriptor.part_number,
                    final_path.display(),
                    descriptor.frame_count
                );
                Ok(FinalizeReport {
                    descriptor,
                    final_path: Some(final_path),
                    state: SegmentState::Finalized,
                })
            }
            Err(e) => {
                // Per-part failures do not abort the run; the finalized
                // file is simply absent and the intermediate is left for
                // temp cleanup.
                warn!("Audio merge failed for part {}: {}", descriptor.part_number, e);
                self.audio_merge_failures += 1;
                Ok(FinalizeReport {
                    descriptor,
                    final_path: None,
                    state: SegmentState::Closed,
                })
            }
        }
    }
}

/// Production store writing silent parts under `output_dir/temp_parts/`
/// and finalizing them into `output_dir/part_<N>.mp4`.
pub struct PartStore {
    output_dir: PathBuf,
    temp_dir: PathBuf,
    source: PathBuf,
    fps: f64,
    out_width: u32,
    out_height: u32,
    encoding: EncodingConfig,
    part_duration_secs: f64,
}

impl PartStore {
    /// Create the store, ensuring the output and temp directories exist.
    pub async fn create(
        output_dir: impl AsRef<Path>,
        source: impl AsRef<Path>,
        fps: f64,
        out_width: u32,
        out_height: u32,
        encoding: EncodingConfig,
        part_duration_secs: f64,
    ) -> MediaResult<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        let temp_dir = output_dir.join(TEMP_PARTS_DIR);
        tokio::fs::create_dir_all(&temp_dir).await?;

        Ok(Self {
            output_dir,
            temp_dir,
            source: source.as_ref().to_path_buf(),
            fps,
            out_width,
            out_height,
            encoding,
            part_duration_secs,
        })
    }

    /// Path of the finalized part file.
    pub fn final_path(&self, part_number: u32) -> PathBuf {
        self.output_dir.join(part_file_name(part_number))
    }
}

#[async_trait]
impl SegmentStore for PartStore {
    fn silent_path(&self, part_number: u32) -> PathBuf {
        self.temp_dir.join(part_file_name(part_number))
    }

    async fn open_part(&mut self, part_number: u32) -> MediaResult<Box<dyn FrameSink>> {
        let sink = RawFrameSink::create(
            self.silent_path(part_number),
            self.out_width,
            self.out_height,
            self.fps,
            &self.encoding,
        )
        .await?;
        Ok(Box::new(sink))
    }

    async fn finalize_part(&mut self, segment: &SegmentDescriptor) -> MediaResult<PathBuf> {
        let final_path = self.final_path(segment.part_number);
        remux::merge_audio(
            &segment.silent_path,
            &self.source,
            segment.part_number,
            segment.start_secs,
            self.part_duration_secs,
            &self.encoding,
            &final_path,
        )
        .await?;
        Ok(final_path)
    }

    async fn cleanup(&mut self) -> MediaResult<()> {
        if !self.temp_dir.exists() {
            return Ok(());
        }
        tokio::fs::remove_dir_all(&self.temp_dir)
            .await
            .map_err(|e| MediaError::CleanupFailed {
                path: self.temp_dir.clone(),
                message: e.to_string(),
            })
    }
}
