//! Streaming frame I/O capabilities.
//!
//! Decoding and encoding stay inside FFmpeg; this module moves raw rgb24
//! frames across pipes. [`RawFrameSource`] reads sequential decoded frames
//! from a source file, [`RawFrameSink`] feeds composited frames into an
//! encoder producing a silent video file.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use image::RgbImage;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use bandstack_models::EncodingConfig;

use crate::command::check_ffmpeg;
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};

/// A single decoded frame with its 0-based sequence index.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Sequence index within the source (0-based)
    pub index: u64,
    /// Pixel data, row-major RGB
    pub pixels: RgbImage,
}

/// Sequential frame-decoding capability.
#[async_trait]
pub trait FrameSource: Send {
    /// Source frame rate.
    fn fps(&self) -> f64;
    /// Total frame count reported by the container.
    fn frame_count(&self) -> u64;
    /// Frame dimensions (width, height).
    fn frame_size(&self) -> (u32, u32);
    /// Read the next frame, or `None` on end of stream.
    async fn read_next(&mut self) -> MediaResult<Option<Frame>>;
}

/// Sink for composited frames of a single segment.
#[async_trait]
pub trait FrameSink: Send {
    /// Append one frame. Dimensions must match the sink's configured size.
    async fn append(&mut self, pixels: &RgbImage) -> MediaResult<()>;
    /// Close the sink, flushing the file to disk.
    async fn finish(self: Box<Self>) -> MediaResult<()>;
    /// Abort the sink, removing any partial file.
    async fn abort(self: Box<Self>) -> MediaResult<()>;
}

/// Frame source decoding a file through an FFmpeg rawvideo pipe.
pub struct RawFrameSource {
    child: Child,
    stdout: ChildStdout,
    info: VideoInfo,
    next_index: u64,
    frame_bytes: usize,
    done: bool,
}

impl RawFrameSource {
    /// Open a source file for sequential decoding.
    ///
    /// Fails with `SourceOpenFailed` when the file cannot be probed, has no
    /// video stream, or reports zero readable frames.
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        check_ffmpeg()?;

        let info = probe_video(path)
            .await
            .map_err(|e| MediaError::source_open_failed(format!("{}: {}", path.display(), e)))?;

        if info.width == 0 || info.height == 0 {
            return Err(MediaError::source_open_failed(format!(
                "{}: video stream has zero dimensions",
                path.display()
            )));
        }
        if info.frame_count == 0 {
            return Err(MediaError::source_open_failed(format!(
                "{}: source yields zero frames",
                path.display()
            )));
        }

        let mut child = Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-i",
                &path.to_string_lossy(),
                "-map",
                "0:v:0",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("decoder stdout not captured"))?;

        debug!(
            "Opened source {} ({}x{} @ {:.3} fps, {} frames)",
            path.display(),
            info.width,
            info.height,
            info.fps,
            info.frame_count
        );

        let frame_bytes = info.width as usize * info.height as usize * 3;
        Ok(Self {
            child,
            stdout,
            info,
            next_index: 0,
            frame_bytes,
            done: false,
        })
    }

    /// Probed source information.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }
}

#[async_trait]
impl FrameSource for RawFrameSource {
    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn frame_size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    async fn read_next(&mut self) -> MediaResult<Option<Frame>> {
        if self.done {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.frame_bytes];
        match self.stdout.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.done = true;
                let status = self.child.wait().await?;
                if !status.success() {
                    warn!("Decoder exited with status {:?} at end of stream", status);
                }
                return Ok(None);
            }
            Err(e) => return Err(MediaError::from(e)),
        }

        let pixels = RgbImage::from_raw(self.info.width, self.info.height, buf)
            .ok_or_else(|| MediaError::internal("raw frame buffer size mismatch"))?;

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Frame { index, pixels }))
    }
}

impl Drop for RawFrameSource {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.start_kill();
        }
    }
}

/// Drain a child's stderr on a background task. Without a concurrent
/// reader a chatty encoder can fill the pipe buffer and stall the stdin
/// frame writes.
fn drain_stderr<R>(mut stderr: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf).await;
        buf
    })
}

/// Frame sink encoding rgb24 frames into a silent video file via FFmpeg.
pub struct RawFrameSink {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: JoinHandle<Vec<u8>>,
    path: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl RawFrameSink {
    /// Spawn an encoder writing to `path`.
    ///
    /// Resolution and codec come from configuration; the frame rate is
    /// copied from the source. The output carries no audio stream.
    pub async fn create(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        fps: f64,
        encoding: &EncodingConfig,
    ) -> MediaResult<Self> {
        let path = path.as_ref().to_path_buf();
        check_ffmpeg()?;

        let mut args: Vec<String> = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "-s".to_string(),
            format!("{}x{}", width, height),
            "-r".to_string(),
            format!("{:.3}", fps),
            "-i".to_string(),
            "pipe:0".to_string(),
        ];
        args.extend(encoding.to_video_args());
        args.push("-an".to_string());
        args.push(path.to_string_lossy().to_string());

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::internal("encoder stdin not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("encoder stderr not captured"))?;
        let stderr_task = drain_stderr(stderr);

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_task,
            path,
            width,
            height,
            frames_written: 0,
        })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FrameSink for RawFrameSink {
    async fn append(&mut self, pixels: &RgbImage) -> MediaResult<()> {
        if pixels.dimensions() != (self.width, self.height) {
            return Err(MediaError::internal(format!(
                "frame size {:?} does not match sink size {}x{}",
                pixels.dimensions(),
                self.width,
                self.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::internal("sink already closed"))?;
        stdin.write_all(pixels.as_raw()).await?;
        self.frames_written += 1;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> MediaResult<()> {
        // Closing stdin signals end of stream to the encoder.
        drop(self.stdin.take());
        let status = self.child.wait().await?;
        let stderr = self.stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                format!("encoder failed for {}", self.path.display()),
                Some(String::from_utf8_lossy(&stderr).to_string()),
                status.code(),
            ));
        }
        debug!(
            "Closed segment file {} ({} frames)",
            self.path.display(),
            self.frames_written
        );
        Ok(())
    }

    async fn abort(mut self: Box<Self>) -> MediaResult<()> {
        drop(self.stdin.take());
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;
        self.stderr_task.abort();
        if self.path.exists() {
            tokio::fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stderr_drained_while_writer_is_busy() {
        // The writer produces far more than the pipe buffer holds; the
        // writes only complete if the drain task consumes concurrently.
        let (mut writer, reader) = tokio::io::duplex(64);
        let task = drain_stderr(reader);

        let chunk = [7u8; 64];
        for _ in 0..8 {
            writer.write_all(&chunk).await.unwrap();
        }
        drop(writer);

        let collected = task.await.unwrap();
        assert_eq!(collected.len(), 512);
    }
}
