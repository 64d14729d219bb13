use crate::camera::camera_media::OpenCvFrameReader;
use crate::camera::preview::{self, KeyCommand};
use crate::config_loader::MasterConfig;
use crate::operations::op_helper;
use crate::persist::depth_store;
use anyhow::{Context, Result};
use clap::ArgMatches;
use log::{debug, info, warn};
use ndarray::Axis;
use opencv::highgui;
use std::time::{Duration, Instant};

const REPLAY_WINDOW: &str = "rsrec replay";

pub async fn handle_replay_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let op_start_time = Instant::now();
    let (manifest, dir) = op_helper::load_manifest_arg(args)?;
    let display = op_helper::display_method(args)?;
    let alpha = master_config.app_settings.depth_colormap_alpha;

    let shown = op_helper::run_blocking("Replay", move || {
        let depths = depth_store::load_depth_npz(&manifest.depth_path(&dir))
            .context("Failed to load depth frames")?;
        let mut reader = OpenCvFrameReader::open(&manifest.color_path(&dir))
            .context("Failed to open color video")?;
        let period = Duration::from_secs_f64(1.0 / manifest.frequency.max(1) as f64);
        highgui::named_window(REPLAY_WINDOW, highgui::WINDOW_AUTOSIZE)?;

        let mut shown = 0usize;
        for depth in depths.axis_iter(Axis(0)) {
            let frame_start = Instant::now();
            let Some(color) = reader.read_mat()? else {
                warn!("⚠️ Color video ended after {} of {} frame(s).", shown, depths.len_of(Axis(0)));
                break;
            };
            let view = preview::render_clip_frame(&color, depth, display, alpha)?;
            highgui::imshow(REPLAY_WINDOW, &view)?;
            shown += 1;

            let wait_ms = period.saturating_sub(frame_start.elapsed()).as_millis().max(1) as i32;
            if preview::poll_key(wait_ms)? == Some(KeyCommand::Quit) {
                debug!("Replay stopped by user at frame {}", shown);
                break;
            }
        }
        highgui::destroy_window(REPLAY_WINDOW)?;
        Ok(shown)
    })
    .await?;

    info!("✅ Replayed {} frame(s) in {:?}.", shown, op_start_time.elapsed());
    Ok(())
}
