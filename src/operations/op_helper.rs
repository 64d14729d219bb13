use crate::app_config::ApplicationConfig;
use crate::camera::camera_media::{OpenCvCodec, VideoCodec};
use crate::common::file_utils;
use crate::config_loader::MasterConfig;
use crate::persist::manifest::ClipManifest;
use crate::session_config::DisplayMethod;
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Output directory from `--out`, falling back to the configured default. Created if missing.
pub fn determine_operation_output_dir(
    master_config: &MasterConfig,
    args: &ArgMatches,
    output_cli_arg_key: &str,
    operation_display_name: &str,
) -> Result<PathBuf> {
    let dir = match args.get_one::<String>(output_cli_arg_key) {
        Some(path_str) => {
            debug!("  Output directory specified via CLI for '{}': {}", operation_display_name, path_str);
            PathBuf::from(path_str)
        }
        None => {
            debug!(
                "  Using default output directory for '{}': {}",
                operation_display_name, master_config.app_settings.output_directory
            );
            PathBuf::from(&master_config.app_settings.output_directory)
        }
    };
    let dir = file_utils::ensure_output_directory(&dir)
        .with_context(|| format!("❌ Failed to prepare output directory for '{}'", operation_display_name))?;
    info!("📁 '{}' will write to {}", operation_display_name, dir.display());
    Ok(dir)
}

pub fn video_codec(app_settings: &ApplicationConfig) -> Result<Arc<dyn VideoCodec>> {
    let codec = OpenCvCodec::new(&app_settings.video_codec, &app_settings.video_extension)
        .context("Invalid video codec settings")?;
    Ok(Arc::new(codec))
}

pub fn display_method(args: &ArgMatches) -> Result<DisplayMethod> {
    match args.get_one::<String>("display") {
        Some(name) => Ok(name.parse()?),
        None => Ok(DisplayMethod::default()),
    }
}

/// Loads the manifest named by the `json` argument and the directory its files live in.
pub fn load_manifest_arg(args: &ArgMatches) -> Result<(ClipManifest, PathBuf)> {
    let path = args
        .get_one::<String>("json")
        .ok_or_else(|| anyhow!("A clip manifest path is required"))?;
    let load_start = Instant::now();
    let (manifest, dir) = ClipManifest::load(Path::new(path))
        .with_context(|| format!("Failed to load clip manifest '{}'", path))?;
    debug!("Loaded manifest '{}' in {:?}", path, load_start.elapsed());
    info!(
        "📼 Clip '{}': {}x{} @ {}Hz, {:.2}s ({} frames)",
        manifest.time,
        manifest.width,
        manifest.height,
        manifest.frequency,
        manifest.time_sec,
        manifest.frame_count()
    );
    Ok((manifest, dir))
}

/// Runs OpenCV/device work on a blocking thread and surfaces panics as errors.
pub async fn run_blocking<T, F>(operation_display_name: &str, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let name = operation_display_name.to_string();
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|join_err| anyhow!("💀 '{}' task panicked or was cancelled: {}", name, join_err))?
}
