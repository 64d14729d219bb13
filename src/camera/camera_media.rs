use crate::errors::AppError;
use log::{debug, info, warn};
use ndarray::{Array3, ArrayView2, ArrayView3, ArrayView4, Axis};
use opencv::{core as opencv_core, prelude::*, videoio};
use std::path::Path;
use std::time::Instant;

/// Encodes color frame sequences to a container file and reads them back.
pub trait VideoCodec: Send + Sync {
    /// File extension (without the dot) of files this codec writes.
    fn extension(&self) -> &str;

    /// Writes `frames` ((n, h, w, 3) BGR8) in order at `fps`.
    fn write_video(&self, path: &Path, frames: ArrayView4<'_, u8>, fps: u32) -> Result<(), AppError>;

    fn open_reader(&self, path: &Path) -> Result<Box<dyn FrameReader>, AppError>;
}

/// Sequential decoder over one video file.
pub trait FrameReader {
    /// Next frame as (h, w, 3) BGR8, or `None` at end of stream.
    fn read_next(&mut self) -> Result<Option<Array3<u8>>, AppError>;
}

#[derive(Debug, Clone)]
pub struct OpenCvCodec {
    fourcc: String,
    extension: String,
}

impl OpenCvCodec {
    pub fn new(fourcc: &str, extension: &str) -> Result<Self, AppError> {
        if fourcc.chars().count() != 4 {
            return Err(AppError::Config(format!("'{}' is not a four character code", fourcc)));
        }
        Ok(OpenCvCodec {
            fourcc: fourcc.to_string(),
            extension: extension.trim_start_matches('.').to_string(),
        })
    }

    fn fourcc_code(&self) -> Result<i32, AppError> {
        let c: Vec<char> = self.fourcc.chars().collect();
        Ok(videoio::VideoWriter::fourcc(c[0], c[1], c[2], c[3])?)
    }
}

impl VideoCodec for OpenCvCodec {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn write_video(&self, path: &Path, frames: ArrayView4<'_, u8>, fps: u32) -> Result<(), AppError> {
        let write_start = Instant::now();
        let (n, height, width, _) = frames.dim();
        let path_str = path
            .to_str()
            .ok_or_else(|| AppError::Io(format!("Invalid path (not UTF-8) for video: {}", path.display())))?;

        let mut writer = videoio::VideoWriter::new(
            path_str,
            self.fourcc_code()?,
            fps as f64,
            opencv_core::Size::new(width as i32, height as i32),
            true,
        )?;
        if !videoio::VideoWriter::is_opened(&writer)? {
            return Err(AppError::Media(format!(
                "Failed to open VideoWriter ({}) at path '{}'",
                self.fourcc,
                path.display()
            )));
        }
        debug!("✍️ VideoWriter opened ({} @ {}fps, {}x{}) for {}", self.fourcc, fps, width, height, path.display());

        for (idx, frame) in frames.axis_iter(Axis(0)).enumerate() {
            let mat = color_to_mat(frame)?;
            writer.write(&mat).map_err(|e| {
                AppError::Media(format!("Write failed for frame {} of '{}': {}", idx, path.display(), e))
            })?;
        }
        writer.release()?;
        info!("🎞️ Encoded {} color frame(s) to {} in {:?}", n, path.display(), write_start.elapsed());
        Ok(())
    }

    fn open_reader(&self, path: &Path) -> Result<Box<dyn FrameReader>, AppError> {
        Ok(Box::new(OpenCvFrameReader::open(path)?))
    }
}

pub struct OpenCvFrameReader {
    capture: videoio::VideoCapture,
    frames_read: usize,
    source: String,
}

impl OpenCvFrameReader {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let source = path.display().to_string();
        let path_str = path
            .to_str()
            .ok_or_else(|| AppError::Io(format!("Invalid path (not UTF-8) for video: {}", source)))?;
        let capture = videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
        if !videoio::VideoCapture::is_opened(&capture)? {
            return Err(AppError::Media(format!("Failed to open video file {}", source)));
        }
        debug!("Opened {} for decoding", source);
        Ok(OpenCvFrameReader { capture, frames_read: 0, source })
    }

    /// Raw OpenCV read used by the display tools.
    pub fn read_mat(&mut self) -> Result<Option<opencv_core::Mat>, AppError> {
        let mut frame = opencv_core::Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            debug!("End of video stream {} after {} frame(s)", self.source, self.frames_read);
            return Ok(None);
        }
        self.frames_read += 1;
        Ok(Some(frame))
    }
}

impl FrameReader for OpenCvFrameReader {
    fn read_next(&mut self) -> Result<Option<Array3<u8>>, AppError> {
        match self.read_mat()? {
            Some(mat) => Ok(Some(mat_to_color(&mat)?)),
            None => Ok(None),
        }
    }
}

impl Drop for OpenCvFrameReader {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("Failed to release VideoCapture for {}: {}", self.source, e);
        }
    }
}

// --- ndarray <-> Mat conversions ---

pub fn color_to_mat(frame: ArrayView3<'_, u8>) -> Result<opencv_core::Mat, AppError> {
    let (height, _, channels) = frame.dim();
    let contiguous = frame.as_standard_layout();
    let data = contiguous
        .as_slice()
        .ok_or_else(|| AppError::Media("Color frame is not contiguous".to_string()))?;
    let flat = opencv_core::Mat::from_slice(data)?;
    let shaped = flat.reshape(channels as i32, height as i32)?;
    Ok(shaped.try_clone()?)
}

pub fn depth_to_mat(depth: ArrayView2<'_, u16>) -> Result<opencv_core::Mat, AppError> {
    let (height, _) = depth.dim();
    let contiguous = depth.as_standard_layout();
    let data = contiguous
        .as_slice()
        .ok_or_else(|| AppError::Media("Depth frame is not contiguous".to_string()))?;
    let flat = opencv_core::Mat::from_slice(data)?;
    let shaped = flat.reshape(1, height as i32)?;
    Ok(shaped.try_clone()?)
}

pub fn mat_to_color(mat: &opencv_core::Mat) -> Result<Array3<u8>, AppError> {
    if mat.channels() != 3 || mat.typ() != opencv_core::CV_8UC3 {
        return Err(AppError::Media(format!(
            "Expected an 8-bit 3 channel frame, got type {} with {} channel(s)",
            mat.typ(),
            mat.channels()
        )));
    }
    let (rows, cols) = (mat.rows() as usize, mat.cols() as usize);
    let owned;
    let continuous = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone()?;
        &owned
    };
    let bytes = continuous.data_bytes()?.to_vec();
    Array3::from_shape_vec((rows, cols, 3), bytes)
        .map_err(|e| AppError::Media(format!("Decoded frame has unexpected layout: {}", e)))
}
