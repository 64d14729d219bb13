use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Not Supported Resolution: ({width},{})", .height.map(|h| h.to_string()).unwrap_or_else(|| "-".to_string()))]
    UnsupportedResolution { width: u32, height: Option<u32> },

    #[error("Device Error: {0}")]
    Device(String),

    #[error("Buffer index {index} out of range for capacity {capacity}")]
    BufferIndexOutOfRange { index: usize, capacity: usize },

    #[error("Frame shape mismatch: expected {expected}, got {actual}")]
    FrameShapeMismatch { expected: String, actual: String },

    #[error("Failed to persist '{path}': {details}")]
    PersistenceWriteFailure { path: PathBuf, details: String },

    #[error("Stream ended during trim: requested end {requested_end}, only {available} frames available")]
    EndOfStreamDuringTrim { requested_end: usize, available: usize },

    #[error("Invalid frame range [{start}, {end})")]
    InvalidRange { start: usize, end: usize },

    #[error("File I/O Error: {0}")]
    Io(String),

    #[error("Media Processing Error: {0}")]
    Media(String),

    #[error("OpenCV Error: {0}")]
    OpenCV(String),

    #[error("Task Execution Error: {0}")]
    Task(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<opencv::Error> for AppError {
    fn from(err: opencv::Error) -> Self {
        AppError::OpenCV(err.to_string())
    }
}

impl From<ndarray_npy::WriteNpzError> for AppError {
    fn from(err: ndarray_npy::WriteNpzError) -> Self {
        AppError::Media(format!("npz write failed: {}", err))
    }
}

impl From<ndarray_npy::ReadNpzError> for AppError {
    fn from(err: ndarray_npy::ReadNpzError) -> Self {
        AppError::Media(format!("npz read failed: {}", err))
    }
}

impl AppError {
    /// Wraps any error raised while writing `path` as a persistence failure.
    pub fn persistence(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        AppError::PersistenceWriteFailure {
            path: path.into(),
            details: err.to_string(),
        }
    }
}
