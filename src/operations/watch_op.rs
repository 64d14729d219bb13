use crate::camera::camera_media::OpenCvFrameReader;
use crate::camera::preview::{self, KeyCommand};
use crate::config_loader::MasterConfig;
use crate::operations::op_helper;
use crate::persist::depth_store;
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use log::{debug, info, warn};
use ndarray::{ArrayView2, Axis};
use opencv::{core::Mat, core::Point, highgui};
use std::time::Instant;

const WATCH_WINDOW: &str = "rsrec watch";

/// Color frames decoded so far. Stepping back never re-decodes.
struct FrameCache {
    reader: OpenCvFrameReader,
    frames: Vec<Mat>,
    exhausted: bool,
}

impl FrameCache {
    fn new(reader: OpenCvFrameReader) -> Self {
        FrameCache { reader, frames: Vec::new(), exhausted: false }
    }

    fn get(&mut self, index: usize) -> Result<Option<&Mat>> {
        while self.frames.len() <= index && !self.exhausted {
            match self.reader.read_mat()? {
                Some(mat) => self.frames.push(mat),
                None => self.exhausted = true,
            }
        }
        Ok(self.frames.get(index))
    }
}

/// Next frame index after a key press, clamped to `[0, count)`.
pub fn step(index: usize, count: usize, key: KeyCommand) -> usize {
    match key {
        KeyCommand::StepForward => (index + 1).min(count.saturating_sub(1)),
        KeyCommand::StepBack => index.saturating_sub(1),
        _ => index,
    }
}

/// Euclidean distance between two depth frames.
pub fn depth_distance(a: ArrayView2<'_, u16>, b: ArrayView2<'_, u16>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

pub async fn handle_watch_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let op_start_time = Instant::now();
    let (manifest, dir) = op_helper::load_manifest_arg(args)?;
    let display = op_helper::display_method(args)?;
    let alpha = master_config.app_settings.depth_colormap_alpha;

    let viewed = op_helper::run_blocking("Watch", move || {
        let depths = depth_store::load_depth_npz(&manifest.depth_path(&dir))
            .context("Failed to load depth frames")?;
        let mut count = depths.len_of(Axis(0));
        if count == 0 {
            bail!("Clip '{}' has no depth frames", manifest.time);
        }
        debug!(
            "Depth distance between first and last frame: {:.1}",
            depth_distance(depths.index_axis(Axis(0), 0), depths.index_axis(Axis(0), count - 1))
        );

        let reader =
            OpenCvFrameReader::open(&manifest.color_path(&dir)).context("Failed to open color video")?;
        let mut cache = FrameCache::new(reader);
        highgui::named_window(WATCH_WINDOW, highgui::WINDOW_AUTOSIZE)?;

        let mut index = 0usize;
        let mut viewed = 0usize;
        loop {
            let color = match cache.get(index)? {
                Some(color) => color,
                None if index > 0 => {
                    warn!("⚠️ Color video has only {} frame(s); clamping.", index);
                    count = index;
                    index -= 1;
                    continue;
                }
                None => bail!("Color video for clip '{}' has no frames", manifest.time),
            };
            let depth = depths.index_axis(Axis(0), index);
            let mut view = preview::render_clip_frame(color, depth, display, alpha)?;
            preview::draw_label(&mut view, &format!("{}/{}f", index + 1, count), Point::new(10, 30))?;
            highgui::imshow(WATCH_WINDOW, &view)?;
            viewed += 1;

            match preview::poll_key(0)? {
                Some(KeyCommand::Quit) => break,
                Some(key) => index = step(index, count, key),
                None => {}
            }
        }
        highgui::destroy_window(WATCH_WINDOW)?;
        Ok(viewed)
    })
    .await?;

    info!("✅ Watch session ended after {} view(s) in {:?}.", viewed, op_start_time.elapsed());
    Ok(())
}
