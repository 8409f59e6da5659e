//! Clip download using yt-dlp.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Resolve a clip page URL to a direct media stream URL (`yt-dlp -g`).
pub async fn resolve_direct_url(url: &str) -> MediaResult<String> {
    check_ytdlp()?;

    let output = Command::new("yt-dlp")
        .args(["-f", "mp4", "-g", url])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::download_failed(format!(
            "yt-dlp -g failed for {}: {}",
            url,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let direct = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if direct.is_empty() {
        return Err(MediaError::download_failed(format!(
            "yt-dlp returned no URL for {}",
            url
        )));
    }
    Ok(direct)
}

/// Download a clip to `dest`.
pub async fn download_clip(url: &str, dest: impl AsRef<Path>) -> MediaResult<()> {
    let dest = dest.as_ref();
    check_ytdlp()?;

    info!("Downloading {} -> {}", url, dest.display());

    let output = Command::new("yt-dlp")
        .arg("-o")
        .arg(dest)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::download_failed(format!(
            "yt-dlp failed for {}: {}",
            url,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

/// Replace filesystem-hostile characters with underscores, collapsing runs.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sub = false;
    for c in name.chars() {
        if matches!(c, '\\' | '/' | ':' | '"' | '*' | '?' | '<' | '>' | '|') {
            if !last_was_sub {
                out.push('_');
                last_was_sub = true;
            }
        } else {
            out.push(c);
            last_was_sub = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(
            sanitize_file_name("shroud - insane 1v5 clutch?!"),
            "shroud - insane 1v5 clutch_!"
        );
        assert_eq!(sanitize_file_name("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_file_name("no_change.mp4"), "no_change.mp4");
    }

    #[test]
    fn test_sanitize_collapses_runs() {
        assert_eq!(sanitize_file_name("what?!?*"), "what_!_");
    }
}
