use crate::errors::AppError;
use log::{debug, warn};
use std::path::{Path, PathBuf};

pub fn ensure_output_directory(dir_path: &Path) -> Result<PathBuf, AppError> {
    if !dir_path.exists() {
        debug!("Output directory '{}' does not exist, attempting to create it.", dir_path.display());
        std::fs::create_dir_all(dir_path).map_err(|e| {
            AppError::Io(format!(
                "Failed to create output directory '{}': {}",
                dir_path.display(),
                e
            ))
        })?;
    } else if !dir_path.is_dir() {
        return Err(AppError::Io(format!(
            "Output path '{}' exists but is not a directory.",
            dir_path.display()
        )));
    }
    Ok(dir_path.to_path_buf())
}

/// Appends `-1`, `-2`, ... to `base_id` until `<id>.json` is free in `dir`.
pub fn unique_clip_id(dir: &Path, base_id: &str) -> String {
    let mut candidate = base_id.to_string();
    let mut suffix = 0;
    while dir.join(format!("{}.json", candidate)).exists() {
        suffix += 1;
        candidate = format!("{}-{}", base_id, suffix);
    }
    candidate
}

/// Best-effort removal of files left behind by a failed write.
pub fn remove_partial_files(paths: &[PathBuf]) {
    for path in paths {
        if path.exists() {
            debug!("Attempting to delete partially created file: {}", path.display());
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to delete partial file {}: {}", path.display(), e);
            }
        }
    }
}
