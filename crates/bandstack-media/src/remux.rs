//! Audio re-muxing and stream-copy chunking.
//!
//! Finalizing a part means merging its silent video stream with the
//! matching audio slice of the original source. The video stream is copied
//! without re-encoding; audio is encoded to the configured lossy codec.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use bandstack_models::EncodingConfig;

use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::get_duration;

/// Build the argument list for an audio merge. Split out for testability.
fn merge_args(
    silent: &Path,
    source: &Path,
    start_secs: f64,
    duration_secs: f64,
    encoding: &EncodingConfig,
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-i".to_string(),
        silent.to_string_lossy().to_string(),
        "-ss".to_string(),
        format!("{:.3}", start_secs),
        "-i".to_string(),
        source.to_string_lossy().to_string(),
        "-t".to_string(),
        format!("{:.3}", duration_secs),
        "-c:v".to_string(),
        "copy".to_string(),
    ];
    args.extend(encoding.to_audio_args());
    args.extend([
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "1:a:0".to_string(),
        "-shortest".to_string(),
        output.to_string_lossy().to_string(),
    ]);
    args
}

/// Merge the audio slice `[start, start + duration)` of `source` into the
/// silent video at `silent`, producing `output`.
///
/// On success the silent intermediate is deleted. On failure the
/// intermediate is left in place for best-effort temp cleanup and an
/// `AudioMergeFailed` error carrying the tool's diagnostics is returned;
/// callers treat this as non-fatal and continue with subsequent parts.
pub async fn merge_audio(
    silent: &Path,
    source: &Path,
    part_number: u32,
    start_secs: f64,
    duration_secs: f64,
    encoding: &EncodingConfig,
    output: &Path,
) -> MediaResult<()> {
    check_ffmpeg()?;

    let args = merge_args(silent, source, start_secs, duration_secs, encoding, output);
    info!(
        "Merging audio into part {} (start: {:.1}s): {}",
        part_number,
        start_secs,
        output.display()
    );

    let result = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !result.status.success() {
        return Err(MediaError::AudioMergeFailed {
            part_number,
            stderr: Some(String::from_utf8_lossy(&result.stderr).to_string()),
            exit_code: result.status.code(),
        });
    }

    if let Err(e) = tokio::fs::remove_file(silent).await {
        warn!(
            "Failed to remove silent intermediate {}: {}",
            silent.display(),
            e
        );
    }

    Ok(())
}

/// Number of chunks a source of `duration_secs` splits into.
pub fn chunk_count(duration_secs: f64, chunk_secs: f64) -> u32 {
    if duration_secs <= 0.0 || chunk_secs <= 0.0 {
        return 0;
    }
    (duration_secs / chunk_secs).ceil() as u32
}

/// Cut one long source into fixed-length stream-copied chunks named
/// `<stem>_part_<i>.<ext>`, deleting the original on completion.
pub async fn split_into_parts(input: &Path, chunk_secs: f64) -> MediaResult<Vec<PathBuf>> {
    let duration = get_duration(input).await?;
    let parts = chunk_count(duration, chunk_secs);
    if parts == 0 {
        return Err(MediaError::InvalidVideo(format!(
            "{}: nothing to split (duration {:.2}s)",
            input.display(),
            duration
        )));
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    let ext = input
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "mp4".to_string());
    let dir = input.parent().unwrap_or_else(|| Path::new("."));

    let runner = FfmpegRunner::new();
    let mut outputs = Vec::with_capacity(parts as usize);
    for i in 0..parts {
        let output = dir.join(format!("{}_part_{}.{}", stem, i + 1, ext));
        let cmd = FfmpegCommand::new(input, &output)
            .seek(i as f64 * chunk_secs)
            .duration(chunk_secs)
            .codec_copy();
        runner.run(&cmd).await?;
        outputs.push(output);
    }

    tokio::fs::remove_file(input).await?;
    info!(
        "Split {} into {} chunks of {:.0}s",
        input.display(),
        parts,
        chunk_secs
    );
    Ok(outputs)
}
