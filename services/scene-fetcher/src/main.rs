//! Scene fetcher.
//!
//! Resolves one scene for a channel and hour (or the most recent hour),
//! prints a JSON summary on stdout and optionally writes the cropped grid
//! as raw little-endian f32, row-major.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use scene_common::{BoundingBox, ChannelSpec, DecodedArray, SceneError, TimeRequest, ValueStats};
use scene_engine::{EngineConfig, Scene, SceneEngine};

#[derive(Parser, Debug)]
#[command(name = "scene-fetcher")]
#[command(about = "Fetch a GOES ABI scene and crop it to a region")]
struct Args {
    /// Channel, e.g. 13 or C13
    #[arg(short, long, default_value = "C13", env = "SCENE_CHANNEL")]
    channel: String,

    /// Date (YYYY-MM-DD); omit with --hour for the most recent scene
    #[arg(long, requires = "hour")]
    date: Option<NaiveDate>,

    /// Hour of day, UTC
    #[arg(long, requires = "date")]
    hour: Option<u32>,

    /// Configured region to crop to
    #[arg(short, long, env = "SCENE_CROP_REGION")]
    region: Option<String>,

    /// Custom region to crop to, as west,south,east,north
    #[arg(long, conflicts_with = "region", allow_hyphen_values = true)]
    bbox: Option<String>,

    /// Engine configuration file
    #[arg(long, env = "SCENE_CONFIG")]
    config: Option<PathBuf>,

    /// Write the cropped grid here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[derive(Serialize)]
struct Summary<'a> {
    #[serde(flatten)]
    scene: &'a Scene,
    label: Option<&'a str>,
    display_range: Option<[f32; 2]>,
    shape: (usize, usize),
    stats: Option<ValueStats>,
    output: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<SceneError>() {
                Some(scene_err) => {
                    eprintln!("{} ({})", scene_err, scene_err.kind());
                    eprintln!("{}", scene_err.guidance());
                }
                None => eprintln!("error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;

    let channel = ChannelSpec::parse(&args.channel)?;
    let request = match (args.date, args.hour) {
        (Some(date), Some(hour)) => TimeRequest::exact(date, hour)?,
        _ => TimeRequest::latest(Utc::now()),
    };

    let engine = SceneEngine::from_config(&config)
        .await
        .context("Failed to initialise scene engine")?;

    info!(channel = %channel, request = ?request, "Fetching scene");
    let scene = engine.fetch(&channel, &request).await?;

    let output = match &args.output {
        Some(path) => {
            write_grid(path, &scene.array).await?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let channel_config = config.channel(&channel);
    let summary = Summary {
        scene: &scene,
        label: channel_config.map(|c| c.label.as_str()),
        display_range: channel_config.and_then(|c| c.display_range),
        shape: scene.array.shape(),
        stats: scene.array.finite_stats(),
        output,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.apply_env()?;
    match (&args.bbox, &args.region) {
        (Some(bbox), _) => {
            let bounds = BoundingBox::from_csv(bbox).context("Invalid --bbox")?;
            config.select_custom_region(bounds)?;
        }
        (None, Some(region)) => config.select_region(region)?,
        (None, None) => {}
    }
    config.validate()?;
    Ok(config)
}

async fn write_grid(path: &Path, array: &DecodedArray) -> Result<()> {
    let bytes = grid_bytes(array.data());
    tokio::fs::write(path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), size = bytes.len(), "Wrote cropped grid");
    Ok(())
}

fn grid_bytes(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}
