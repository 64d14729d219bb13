use crate::camera::camera_media::VideoCodec;
use crate::common::{file_utils, timestamp_utils};
use crate::core::capture_source::CameraIntrinsics;
use crate::errors::AppError;
use crate::persist::depth_store;
use crate::persist::manifest::ClipManifest;
use crate::session_config::SessionConfig;
use log::{debug, error, info};
use ndarray::{s, ArrayView3, ArrayView4, Axis};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Writes a clip as three sibling files: `<id>-depth.npz`, `<id>-rgb.<ext>`
/// and the `<id>.json` manifest that names them.
#[derive(Clone)]
pub struct ClipWriter {
    out_dir: PathBuf,
    codec: Arc<dyn VideoCodec>,
    timestamp_format: String,
    id_prefix: String,
}

impl ClipWriter {
    pub fn new(out_dir: impl Into<PathBuf>, codec: Arc<dyn VideoCodec>, timestamp_format: &str) -> Self {
        ClipWriter {
            out_dir: out_dir.into(),
            codec,
            timestamp_format: timestamp_format.to_string(),
            id_prefix: String::new(),
        }
    }

    /// Prefix prepended to every generated id (trimmed clips use `c`).
    pub fn with_id_prefix(mut self, prefix: &str) -> Self {
        self.id_prefix = prefix.to_string();
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn write(
        &self,
        colors: ArrayView4<'_, u8>,
        depths: ArrayView3<'_, u16>,
        frames_written: usize,
        session: &SessionConfig,
        intrinsics: &CameraIntrinsics,
    ) -> Result<ClipManifest, AppError> {
        let save_start = Instant::now();
        self.check_inputs(&colors, &depths, frames_written, session)?;

        let out_dir = file_utils::ensure_output_directory(&self.out_dir)?;
        let base_id = timestamp_utils::clip_id(&self.id_prefix, &self.timestamp_format);
        let id = file_utils::unique_clip_id(&out_dir, &base_id);

        let manifest = ClipManifest {
            color_file: format!("{}-rgb.{}", id, self.codec.extension()),
            depth_file: format!("{}-depth.npz", id),
            frequency: session.frequency,
            height: session.height,
            intrinsics_color: intrinsics.color.clone(),
            intrinsics_depth: intrinsics.depth.clone(),
            time: id.clone(),
            time_sec: session.seconds_for(frames_written),
            width: session.width,
        };
        debug!("Writing clip '{}' ({} frames) to {}", id, frames_written, out_dir.display());

        let mut written_paths: Vec<PathBuf> = Vec::new();
        let result = self.write_files(
            &out_dir,
            &manifest,
            colors.slice(s![..frames_written, .., .., ..]),
            depths.slice(s![..frames_written, .., ..]),
            &mut written_paths,
        );

        match result {
            Ok(()) => {
                info!(
                    "💾 Saved clip '{}' ({} frames, {:.2}s) to {} in {:?}",
                    id,
                    frames_written,
                    manifest.time_sec,
                    out_dir.display(),
                    save_start.elapsed()
                );
                Ok(manifest)
            }
            Err(e) => {
                error!("❌ Failed to save clip '{}' after {:?}: {}", id, save_start.elapsed(), e);
                file_utils::remove_partial_files(&written_paths);
                Err(e)
            }
        }
    }

    fn check_inputs(
        &self,
        colors: &ArrayView4<'_, u8>,
        depths: &ArrayView3<'_, u16>,
        frames_written: usize,
        session: &SessionConfig,
    ) -> Result<(), AppError> {
        let capacity = colors.len_of(Axis(0)).min(depths.len_of(Axis(0)));
        if frames_written == 0 {
            return Err(AppError::Media("Refusing to write a clip with no frames".to_string()));
        }
        if frames_written > capacity {
            return Err(AppError::BufferIndexOutOfRange { index: frames_written - 1, capacity });
        }
        let (h, w) = (session.height as usize, session.width as usize);
        let (_, ch, cw, cc) = colors.dim();
        let (_, dh, dw) = depths.dim();
        if (ch, cw, cc) != (h, w, 3) || (dh, dw) != (h, w) {
            return Err(AppError::FrameShapeMismatch {
                expected: format!("{}x{}", w, h),
                actual: format!("color {}x{}x{}, depth {}x{}", cw, ch, cc, dw, dh),
            });
        }
        Ok(())
    }

    fn write_files(
        &self,
        out_dir: &Path,
        manifest: &ClipManifest,
        colors: ArrayView4<'_, u8>,
        depths: ArrayView3<'_, u16>,
        written_paths: &mut Vec<PathBuf>,
    ) -> Result<(), AppError> {
        let depth_path = manifest.depth_path(out_dir);
        written_paths.push(depth_path.clone());
        depth_store::save_depth_npz(&depth_path, depths)
            .map_err(|e| AppError::persistence(&depth_path, e))?;

        let color_path = manifest.color_path(out_dir);
        written_paths.push(color_path.clone());
        self.codec
            .write_video(&color_path, colors, manifest.frequency)
            .map_err(|e| AppError::persistence(&color_path, e))?;

        // The manifest goes last so it never names a file that was not written.
        let json_path = out_dir.join(format!("{}.json", manifest.time));
        written_paths.push(json_path.clone());
        fs::write(&json_path, manifest.to_json()?).map_err(|e| AppError::persistence(&json_path, e))?;
        Ok(())
    }
}
