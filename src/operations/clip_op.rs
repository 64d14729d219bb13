use crate::config_loader::MasterConfig;
use crate::operations::op_helper;
use crate::persist::clip_writer::ClipWriter;
use crate::persist::trimmer;
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use log::{debug, info};
use std::time::Instant;

pub async fn handle_clip_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let op_start_time = Instant::now();
    let operation_display_name = "Clip";
    let app = &master_config.app_settings;

    let start = *args.get_one::<usize>("start").ok_or_else(|| anyhow!("START is required"))?;
    let end = *args.get_one::<usize>("end").ok_or_else(|| anyhow!("END is required"))?;
    let (manifest, dir) = op_helper::load_manifest_arg(args)?;
    let session = manifest
        .session_config()
        .context("Clip manifest describes an invalid session")?;
    debug!("Clip CLI: [{}, {}) of '{}' with {:?}", start, end, manifest.time, session);

    let output_dir = op_helper::determine_operation_output_dir(master_config, args, "output", operation_display_name)?;
    let codec = op_helper::video_codec(app)?;
    let writer = ClipWriter::new(output_dir, codec.clone(), &app.filename_timestamp_format)
        .with_id_prefix(&app.clip_id_prefix);

    let trimmed = op_helper::run_blocking(operation_display_name, move || {
        let manifest_out = trimmer::trim(
            &*codec,
            &manifest.color_path(&dir),
            &manifest.depth_path(&dir),
            start,
            end,
            &session,
            &writer,
            &manifest.intrinsics(),
        )
        .with_context(|| format!("Failed to trim '{}' to [{}, {})", manifest.time, start, end))?;
        Ok(manifest_out)
    })
    .await?;

    info!(
        "✅ Wrote '{}' ({} frames, {:.2}s) in {:?}: {}, {}",
        trimmed.time,
        end - start,
        trimmed.time_sec,
        op_start_time.elapsed(),
        trimmed.color_file,
        trimmed.depth_file
    );
    Ok(())
}
