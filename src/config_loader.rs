use serde::Deserialize;
use std::fs;
use std::path::Path;
use crate::app_config::{ApplicationConfig, DeviceConfig};
use anyhow::{Result, Context, bail};
use chrono::format::{Item, StrftimeItems};
use log::{debug, info};
use std::time::Instant;

pub const DEFAULT_CONFIG_PATH: &str = "config/rsrec.yaml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MasterConfig {
    #[serde(rename = "application", default)]
    pub app_settings: ApplicationConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

pub fn load_config(path: &str) -> Result<MasterConfig> {
    debug!("📄 Attempting to load config from: {}", path);
    let start_time = Instant::now();

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file '{}'. 📖", path))?;
    debug!("Read config file in {:?}", start_time.elapsed());

    let config = parse_config(&config_str)
        .with_context(|| format!("Failed to load configuration from '{}'. 💔", path))?;

    info!("✅ Successfully loaded and validated configuration from '{}' in {:?}", path, start_time.elapsed());
    Ok(config)
}

/// Loads the explicitly requested file, or the default file when it exists,
/// or falls back to built-in defaults.
pub fn load_or_default(explicit_path: Option<&str>) -> Result<MasterConfig> {
    match explicit_path {
        Some(path) => load_config(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH),
        None => {
            debug!("No configuration file at '{}', using built-in defaults.", DEFAULT_CONFIG_PATH);
            let config = MasterConfig::default();
            validate_master_config(&config)?;
            Ok(config)
        }
    }
}

pub fn parse_config(config_str: &str) -> Result<MasterConfig> {
    let parse_start_time = Instant::now();
    let config: MasterConfig = serde_yaml::from_str(config_str)
        .context("Failed to parse YAML configuration")?;
    debug!("Parsed YAML in {:?}", parse_start_time.elapsed());

    validate_master_config(&config).context("Master configuration validation failed 👎")?;
    Ok(config)
}

fn validate_master_config(config: &MasterConfig) -> Result<()> {
    debug!("🕵️ Validating master configuration...");
    let validation_start_time = Instant::now();
    let app = &config.app_settings;

    if app.output_directory.is_empty() {
        bail!("❌ Application output_directory cannot be empty.");
    }
    let output_path = Path::new(&app.output_directory);
    if output_path.exists() && !output_path.is_dir() {
        bail!("❌ Output directory '{}' exists but is not a directory.", app.output_directory);
    }
    if app.video_codec.chars().count() != 4 {
        bail!("❌ video_codec must be a four character code, got '{}'.", app.video_codec);
    }
    if app.video_extension.is_empty() || app.video_extension.contains('.') {
        bail!("❌ video_extension must be a bare extension such as 'avi', got '{}'.", app.video_extension);
    }
    if app.filename_timestamp_format.is_empty() {
        bail!("❌ filename_timestamp_format cannot be empty.");
    }
    if StrftimeItems::new(&app.filename_timestamp_format).any(|item| matches!(item, Item::Error)) {
        bail!("❌ filename_timestamp_format '{}' is not a valid strftime format.", app.filename_timestamp_format);
    }
    if !(app.countdown_seconds >= 0.0) {
        bail!("❌ countdown_seconds must be zero or positive, got {}.", app.countdown_seconds);
    }
    if app.preview_width == 0 || app.preview_height == 0 {
        bail!("❌ Preview size must be non-zero, got {}x{}.", app.preview_width, app.preview_height);
    }
    if !(app.depth_colormap_alpha > 0.0) {
        bail!("❌ depth_colormap_alpha must be positive, got {}.", app.depth_colormap_alpha);
    }
    if app.max_consecutive_dropped_frames == 0 {
        bail!("❌ max_consecutive_dropped_frames must be at least 1.");
    }
    if let Some(serial) = &config.device.serial_number {
        if serial.trim().is_empty() {
            bail!("❌ Device serial_number cannot be blank when set.");
        }
    }

    info!("👍 Master configuration validated successfully in {:?}.", validation_start_time.elapsed());
    Ok(())
}
