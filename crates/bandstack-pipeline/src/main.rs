//! Bandstack command-line entry point.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use bandstack_clips::ClipsClient;
use bandstack_media::{download_clip, probe_video, sanitize_file_name, split_into_parts};
use bandstack_models::{Rect, RegionPair, PART_DURATION_SECS};
use bandstack_pipeline::{logging, PipelineConfig, PipelineController};

const USAGE: &str = "\
Usage:
  bandstack run <source> <output_dir> AX AY AW AH BX BY BW BH [CANVAS_W CANVAS_H]
  bandstack split <file> [chunk_secs]
  bandstack fetch <clip_url> <dest_dir>
  bandstack clips <channel> [channel...]

Region coordinates are canvas pixels; without CANVAS_W/CANVAS_H they are
taken as source frame pixels.";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = dispatch(&args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn dispatch(args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("run") => cmd_run(&args[1..]).await,
        Some("split") => cmd_split(&args[1..]).await,
        Some("fetch") => cmd_fetch(&args[1..]).await,
        Some("clips") => cmd_clips(&args[1..]).await,
        _ => bail!("{}", USAGE),
    }
}

async fn cmd_run(args: &[String]) -> Result<()> {
    if args.len() != 10 && args.len() != 12 {
        bail!("{}", USAGE);
    }
    let source = PathBuf::from(&args[0]);
    let output_dir = PathBuf::from(&args[1]);

    let coords: Vec<u32> = args[2..]
        .iter()
        .map(|s| s.parse().with_context(|| format!("bad coordinate: {}", s)))
        .collect::<Result<_>>()?;

    let regions = RegionPair {
        a: Rect {
            x: coords[0],
            y: coords[1],
            width: coords[2],
            height: coords[3],
        },
        b: Rect {
            x: coords[4],
            y: coords[5],
            width: coords[6],
            height: coords[7],
        },
    };

    let canvas_size = if coords.len() == 10 {
        (coords[8], coords[9])
    } else {
        // Coordinates are already in source pixels; identity mapping.
        let info = probe_video(&source).await?;
        (info.width, info.height)
    };

    let config = PipelineConfig::from_env()?;
    let controller = PipelineController::new(config)?;
    let mut handle = controller
        .start(&source, &output_dir, regions, canvas_size)
        .await?;

    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal, cancelling run");
        let _ = cancel.send(true);
    });

    while let Some(pct) = handle.recv_progress().await {
        info!("Progress: {}%", pct);
    }

    let outcome = handle.wait().await?;
    info!(
        "Done: {:?} ({} parts finalized, {} merge failures)",
        outcome.status, outcome.parts_finalized, outcome.audio_merge_failures
    );
    Ok(())
}

async fn cmd_split(args: &[String]) -> Result<()> {
    let input = match args.first() {
        Some(path) => PathBuf::from(path),
        None => bail!("{}", USAGE),
    };
    let chunk_secs = match args.get(1) {
        Some(s) => s.parse().with_context(|| format!("bad duration: {}", s))?,
        None => PART_DURATION_SECS,
    };

    let parts = split_into_parts(&input, chunk_secs).await?;
    for part in parts {
        info!("Wrote {}", part.display());
    }
    Ok(())
}

async fn cmd_fetch(args: &[String]) -> Result<()> {
    let (url, dest_dir) = match (args.first(), args.get(1)) {
        (Some(url), Some(dir)) => (url, PathBuf::from(dir)),
        _ => bail!("{}", USAGE),
    };

    tokio::fs::create_dir_all(&dest_dir).await?;
    let name = url.rsplit('/').next().unwrap_or("clip");
    let dest = dest_dir.join(format!("{}.mp4", sanitize_file_name(name)));
    download_clip(url, &dest).await?;
    info!("Saved {}", dest.display());
    Ok(())
}

async fn cmd_clips(args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("{}", USAGE);
    }
    let channels: Vec<&str> = args.iter().map(String::as_str).collect();

    let client = ClipsClient::from_env().await?;
    let clips = client.top_clips(&channels, 10).await?;
    for clip in clips {
        println!("{:>8}  {:<20}  {}", clip.view_count, clip.channel, clip.url);
    }
    Ok(())
}
