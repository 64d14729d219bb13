use crate::errors::AppError;
use log::{debug, warn};
use ndarray::{Array3, ArrayView3};
use ndarray_npy::{NpzReader, NpzWriter, ReadNpzError};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

/// numpy's name for the first positional array passed to `savez_compressed`.
pub const DEPTH_ENTRY_NAME: &str = "arr_0";

/// Writes `(frames, height, width)` depth samples as a compressed `.npz`
/// holding a single array.
pub fn save_depth_npz(path: &Path, depths: ArrayView3<'_, u16>) -> Result<(), AppError> {
    let start_time = Instant::now();
    let file = File::create(path)?;
    let mut npz = NpzWriter::new_compressed(BufWriter::new(file));
    npz.add_array(DEPTH_ENTRY_NAME, &depths)?;
    npz.finish()?;
    debug!("💾 Saved depth array {:?} to {} in {:?}", depths.dim(), path.display(), start_time.elapsed());
    Ok(())
}

/// Loads the first array of a depth `.npz`.
///
/// Older clips stored depth as float64; those are converted back to Z16.
pub fn load_depth_npz(path: &Path) -> Result<Array3<u16>, AppError> {
    let start_time = Instant::now();
    let mut npz = NpzReader::new(File::open(path)?)?;
    if npz.is_empty() {
        return Err(AppError::Media(format!("Depth archive {} contains no arrays", path.display())));
    }

    let depths = match npz.by_index::<ndarray::OwnedRepr<u16>, ndarray::Ix3>(0) {
        Ok(arr) => arr,
        Err(ReadNpzError::Npy(e)) => {
            warn!("Depth in {} is not u16 ({}); trying float64.", path.display(), e);
            let as_float: Array3<f64> = npz.by_index(0)?;
            as_float.mapv(|v| v.round().clamp(0.0, u16::MAX as f64) as u16)
        }
        Err(e) => return Err(e.into()),
    };
    debug!("📂 Loaded depth array {:?} from {} in {:?}", depths.dim(), path.display(), start_time.elapsed());
    Ok(depths)
}
