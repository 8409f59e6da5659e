//! Run controller: owns the frame loop and the run lifecycle.
//!
//! A run is set up synchronously ([`PipelineController::start`] fails
//! before spawning anything when the source or the geometry is unusable)
//! and then driven on a dedicated tokio task. The caller keeps a
//! [`RunHandle`] for progress, cancellation and the final outcome.

use std::path::Path;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use bandstack_media::{
    map_to_frame, BandCompositor, FrameSource, PartStore, RawFrameSource, SegmentStore,
    SegmentWriter,
};
use bandstack_models::{frames_per_part, RegionPair, RunOutcome, RunStatus};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::progress::{progress_channel, ProgressSender};

/// Handle to a spawned run.
pub struct RunHandle {
    progress: mpsc::UnboundedReceiver<u8>,
    cancel: watch::Sender<bool>,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Request cooperative cancellation. The frame loop observes the flag
    /// between frames; in-flight FFmpeg work is not killed.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Sender half of the cancellation flag, for wiring signal handlers.
    pub fn cancel_token(&self) -> watch::Sender<bool> {
        self.cancel.clone()
    }

    /// Receive the next progress percentage, `None` once the run is over.
    pub async fn recv_progress(&mut self) -> Option<u8> {
        self.progress.recv().await
    }

    /// Wait for the run to reach a terminal state.
    pub async fn wait(self) -> PipelineResult<RunOutcome> {
        Ok(self.task.await?)
    }
}

/// Controller that spawns reframing runs.
pub struct PipelineController {
    config: PipelineConfig,
}

impl PipelineController {
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Start a run over `source`, writing parts under `output_dir`.
    ///
    /// `regions` are in canvas coordinates and are mapped to source frame
    /// coordinates here, using the canvas size the rectangles were drawn
    /// against. The pair is captured by value; later edits on the caller's
    /// side do not affect a running job.
    ///
    /// Setup errors (unreadable source, zero frames, degenerate canvas)
    /// are returned directly and nothing is spawned.
    pub async fn start(
        &self,
        source: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        regions: RegionPair,
        canvas_size: (u32, u32),
    ) -> PipelineResult<RunHandle> {
        let source = source.as_ref();

        let frame_source = RawFrameSource::open(source).await?;
        let frame_size = frame_source.frame_size();
        let fps = frame_source.fps();

        let mapped = RegionPair {
            a: map_to_frame(regions.a, canvas_size, frame_size)?,
            b: map_to_frame(regions.b, canvas_size, frame_size)?,
        };

        let store = PartStore::create(
            output_dir,
            source,
            fps,
            self.config.out_width,
            self.config.out_height,
            self.config.encoding.clone(),
            self.config.part_duration_secs,
        )
        .await?;

        let writer = SegmentWriter::new(
            store,
            frames_per_part(self.config.part_duration_secs, fps),
            self.config.part_duration_secs,
        );
        let compositor = BandCompositor::new(self.config.out_width, self.config.out_height);

        let (progress_tx, progress_rx) = progress_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        info!(
            "Starting run: {} -> {}x{} parts of {}s",
            source.display(),
            self.config.out_width,
            self.config.out_height,
            self.config.part_duration_secs
        );

        let task = tokio::spawn(run_loop(
            frame_source,
            writer,
            compositor,
            mapped,
            progress_tx,
            cancel_rx,
        ));

        Ok(RunHandle {
            progress: progress_rx,
            cancel: cancel_tx,
            task,
        })
    }
}

/// Drive one run to a terminal state.
///
/// Frames that the compositor skips advance progress but are never
/// appended. Cancellation discards the in-progress part; finalized parts
/// stay on disk. The temp directory is removed on every exit path.
pub async fn run_loop<Src, S>(
    mut source: Src,
    mut writer: SegmentWriter<S>,
    compositor: BandCompositor,
    regions: RegionPair,
    mut progress: ProgressSender,
    cancel: watch::Receiver<bool>,
) -> RunOutcome
where
    Src: FrameSource,
    S: SegmentStore,
{
    let total = source.frame_count();
    let mut frames_read = 0u64;
    let mut status = RunStatus::Running;

    progress.emit(0);

    loop {
        if *cancel.borrow() {
            info!("Cancellation observed after {} frames", frames_read);
            status = RunStatus::Cancelled;
            break;
        }

        let frame = match source.read_next().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                status = RunStatus::Completed;
                break;
            }
            Err(e) => {
                // A decoder dying mid-stream ends the input; everything
                // read so far is still finalized.
                warn!("Frame read failed after {} frames: {}", frames_read, e);
                status = RunStatus::Completed;
                break;
            }
        };
        frames_read += 1;

        if let Some(combined) = compositor.composite(&frame, &regions) {
            if let Err(e) = writer.append(&combined).await {
                error!("Append failed on frame {}: {}", frame.index, e);
                status = RunStatus::Failed;
                break;
            }
        }

        progress.emit_ratio(frames_read, total);
    }

    match status {
        RunStatus::Completed => {
            if let Err(e) = writer.finish().await {
                warn!("Failed to close trailing part: {}", e);
            }
            progress.emit(100);
        }
        _ => {
            if let Err(e) = writer.discard_open().await {
                warn!("Failed to discard open part: {}", e);
            }
        }
    }
    writer.cleanup().await;

    let outcome = RunOutcome {
        status,
        final_progress: progress.last(),
        frames_read,
        parts_finalized: writer.parts_finalized(),
        audio_merge_failures: writer.audio_merge_failures(),
    };
    info!(
        "Run finished: {:?}, {} frames read, {} parts, {} merge failures",
        outcome.status, outcome.frames_read, outcome.parts_finalized, outcome.audio_merge_failures
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use image::RgbImage;

    use bandstack_media::{Frame, FrameSink, MediaError, MediaResult};
    use bandstack_models::{part_file_name, Rect, SegmentDescriptor};

    struct FakeSource {
        total: u64,
        emitted: u64,
        width: u32,
        height: u32,
        fps: f64,
        cancel_at: Option<(u64, watch::Sender<bool>)>,
    }

    impl FakeSource {
        fn new(total: u64, width: u32, height: u32, fps: f64) -> Self {
            Self {
                total,
                emitted: 0,
                width,
                height,
                fps,
                cancel_at: None,
            }
        }
    }

    #[async_trait]
    impl FrameSource for FakeSource {
        fn fps(&self) -> f64 {
            self.fps
        }
        fn frame_count(&self) -> u64 {
            self.total
        }
        fn frame_size(&self) -> (u32, u32) {
            (self.width, self.height)
        }
        async fn read_next(&mut self) -> MediaResult<Option<Frame>> {
            if self.emitted >= self.total {
                return Ok(None);
            }
            if let Some((at, tx)) = &self.cancel_at {
                if self.emitted == *at {
                    let _ = tx.send(true);
                }
            }
            let index = self.emitted;
            self.emitted += 1;
            Ok(Some(Frame {
                index,
                pixels: RgbImage::new(self.width, self.height),
            }))
        }
    }

    #[derive(Debug, Default)]
    struct StoreLog {
        finalized: Vec<SegmentDescriptor>,
        aborted: u32,
        cleaned: bool,
    }

    struct FakeSink {
        log: Arc<Mutex<StoreLog>>,
    }

    #[async_trait]
    impl FrameSink for FakeSink {
        async fn append(&mut self, _pixels: &RgbImage) -> MediaResult<()> {
            Ok(())
        }
        async fn finish(self: Box<Self>) -> MediaResult<()> {
            Ok(())
        }
        async fn abort(self: Box<Self>) -> MediaResult<()> {
            self.log.lock().unwrap().aborted += 1;
            Ok(())
        }
    }

    struct FakeStore {
        log: Arc<Mutex<StoreLog>>,
        fail_parts: Vec<u32>,
    }

    impl FakeStore {
        fn new() -> (Self, Arc<Mutex<StoreLog>>) {
            let log = Arc::new(Mutex::new(StoreLog::default()));
            (
                Self {
                    log: log.clone(),
                    fail_parts: Vec::new(),
                },
                log,
            )
        }
    }

    #[async_trait]
    impl SegmentStore for FakeStore {
        fn silent_path(&self, part_number: u32) -> PathBuf {
            PathBuf::from(format!("/tmp/fake/{}", part_file_name(part_number)))
        }
        async fn open_part(&mut self, _part_number: u32) -> MediaResult<Box<dyn FrameSink>> {
            Ok(Box::new(FakeSink {
                log: self.log.clone(),
            }))
        }
        async fn finalize_part(&mut self, segment: &SegmentDescriptor) -> MediaResult<PathBuf> {
            if self.fail_parts.contains(&segment.part_number) {
                return Err(MediaError::AudioMergeFailed {
                    part_number: segment.part_number,
                    stderr: None,
                    exit_code: Some(1),
                });
            }
            self.log.lock().unwrap().finalized.push(segment.clone());
            Ok(PathBuf::from(part_file_name(segment.part_number)))
        }
        async fn cleanup(&mut self) -> MediaResult<()> {
            self.log.lock().unwrap().cleaned = true;
            Ok(())
        }
    }

    fn regions() -> RegionPair {
        RegionPair {
            a: Rect {
                x: 0,
                y: 0,
                width: 2,
                height: 2,
            },
            b: Rect {
                x: 0,
                y: 2,
                width: 2,
                height: 2,
            },
        }
    }

    fn run_parts(
        total: u64,
        fps: f64,
    ) -> (
        FakeSource,
        Arc<Mutex<StoreLog>>,
        SegmentWriter<FakeStore>,
        BandCompositor,
    ) {
        let source = FakeSource::new(total, 4, 4, fps);
        let (store, log) = FakeStore::new();
        let writer = SegmentWriter::new(store, frames_per_part(180.0, fps), 180.0);
        let compositor = BandCompositor::new(4, 8);
        (source, log, writer, compositor)
    }

    #[tokio::test]
    async fn test_three_minute_source_yields_single_part() {
        let (source, log, writer, compositor) = run_parts(5400, 30.0);
        let (progress, _rx) = progress_channel();
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let outcome = run_loop(source, writer, compositor, regions(), progress, cancel_rx).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.frames_read, 5400);
        assert_eq!(outcome.parts_finalized, 1);
        assert_eq!(outcome.final_progress, 100);

        let log = log.lock().unwrap();
        assert_eq!(log.finalized.len(), 1);
        assert_eq!(log.finalized[0].frame_count, 5400);
        assert_eq!(log.finalized[0].start_secs, 0.0);
        assert!(log.cleaned);
    }

    #[tokio::test]
    async fn test_six_minute_source_yields_two_parts() {
        let (source, log, writer, compositor) = run_parts(10800, 30.0);
        let (progress, _rx) = progress_channel();
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let outcome = run_loop(source, writer, compositor, regions(), progress, cancel_rx).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.parts_finalized, 2);

        let log = log.lock().unwrap();
        assert_eq!(log.finalized[0].start_secs, 0.0);
        assert_eq!(log.finalized[1].start_secs, 180.0);
        assert_eq!(log.finalized[1].frame_count, 5400);
    }

    #[tokio::test]
    async fn test_cancellation_keeps_finalized_parts_only() {
        let mut source = FakeSource::new(12, 4, 4, 30.0);
        let (store, log) = FakeStore::new();
        // 5 frames per part so the run is cancelled inside part 2
        let writer = SegmentWriter::new(store, 5, 180.0);
        let compositor = BandCompositor::new(4, 8);
        let (progress, _rx) = progress_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        source.cancel_at = Some((7, cancel_tx));

        let outcome = run_loop(source, writer, compositor, regions(), progress, cancel_rx).await;

        assert_eq!(outcome.status, RunStatus::Cancelled);
        assert_eq!(outcome.frames_read, 8);
        assert_eq!(outcome.parts_finalized, 1);
        assert!(outcome.final_progress < 100);

        let log = log.lock().unwrap();
        assert_eq!(log.finalized.len(), 1);
        assert_eq!(log.aborted, 1);
        assert!(log.cleaned);
    }

    #[tokio::test]
    async fn test_degenerate_region_skips_every_frame() {
        let source = FakeSource::new(20, 4, 4, 30.0);
        let (store, log) = FakeStore::new();
        let writer = SegmentWriter::new(store, 5, 180.0);
        let compositor = BandCompositor::new(4, 8);
        let (progress, _rx) = progress_channel();
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let mut pair = regions();
        pair.b.height = 0;

        let outcome = run_loop(source, writer, compositor, pair, progress, cancel_rx).await;

        // The run completes; no part file ever opens.
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.frames_read, 20);
        assert_eq!(outcome.parts_finalized, 0);
        assert_eq!(outcome.final_progress, 100);
        assert!(log.lock().unwrap().finalized.is_empty());
    }

    #[tokio::test]
    async fn test_progress_is_monotone_and_ends_at_hundred() {
        let source = FakeSource::new(50, 4, 4, 30.0);
        let (store, _log) = FakeStore::new();
        let writer = SegmentWriter::new(store, 20, 180.0);
        let compositor = BandCompositor::new(4, 8);
        let (progress, mut rx) = progress_channel();
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        run_loop(source, writer, compositor, regions(), progress, cancel_rx).await;

        let mut seen = Vec::new();
        while let Ok(v) = rx.try_recv() {
            seen.push(v);
        }
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last().copied(), Some(100));
    }

    #[tokio::test]
    async fn test_merge_failures_reach_the_outcome() {
        let source = FakeSource::new(10, 4, 4, 30.0);
        let (mut store, _log) = FakeStore::new();
        store.fail_parts = vec![1];
        let writer = SegmentWriter::new(store, 5, 180.0);
        let compositor = BandCompositor::new(4, 8);
        let (progress, _rx) = progress_channel();
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let outcome = run_loop(source, writer, compositor, regions(), progress, cancel_rx).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.parts_finalized, 1);
        assert_eq!(outcome.audio_merge_failures, 1);
    }
}
