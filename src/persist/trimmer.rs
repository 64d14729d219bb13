use crate::camera::camera_media::VideoCodec;
use crate::core::capture_source::CameraIntrinsics;
use crate::errors::AppError;
use crate::persist::clip_writer::ClipWriter;
use crate::persist::depth_store;
use crate::persist::manifest::ClipManifest;
use crate::session_config::SessionConfig;
use log::{debug, info};
use ndarray::{s, Array4, Axis};
use std::path::Path;
use std::time::Instant;

/// Cuts frames `[start, end)` out of a saved clip and writes them as a new clip.
#[allow(clippy::too_many_arguments)]
pub fn trim(
    codec: &dyn VideoCodec,
    color_path: &Path,
    depth_path: &Path,
    start: usize,
    end: usize,
    session: &SessionConfig,
    writer: &ClipWriter,
    intrinsics: &CameraIntrinsics,
) -> Result<ClipManifest, AppError> {
    let trim_start = Instant::now();
    if start >= end {
        return Err(AppError::InvalidRange { start, end });
    }

    let depths = depth_store::load_depth_npz(depth_path)?;
    let available = depths.len_of(Axis(0));
    if end > available {
        return Err(AppError::EndOfStreamDuringTrim { requested_end: end, available });
    }
    let (_, dh, dw) = depths.dim();
    if (dw as u32, dh as u32) != (session.width, session.height) {
        return Err(AppError::FrameShapeMismatch {
            expected: format!("{}x{}", session.width, session.height),
            actual: format!("depth {}x{}", dw, dh),
        });
    }

    let (w, h) = (session.width as usize, session.height as usize);
    let mut colors = Array4::<u8>::zeros((end - start, h, w, 3));
    let mut reader = codec.open_reader(color_path)?;
    let mut current_frame = 0usize;
    while current_frame < end {
        let frame = reader.read_next()?.ok_or(AppError::EndOfStreamDuringTrim {
            requested_end: end,
            available: current_frame,
        })?;
        if current_frame >= start {
            if frame.dim() != (h, w, 3) {
                return Err(AppError::FrameShapeMismatch {
                    expected: format!("color {}x{}x3", h, w),
                    actual: format!("color {:?}", frame.dim()),
                });
            }
            colors.index_axis_mut(Axis(0), current_frame - start).assign(&frame);
        }
        current_frame += 1;
    }
    debug!("Decoded {} color frame(s) in {:?}", current_frame, trim_start.elapsed());

    let manifest = writer.write(
        colors.view(),
        depths.slice(s![start..end, .., ..]),
        end - start,
        session,
        intrinsics,
    )?;
    info!("✂️ Trimmed [{}, {}) into '{}' in {:?}", start, end, manifest.time, trim_start.elapsed());
    Ok(manifest)
}
