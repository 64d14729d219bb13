use crate::errors::AppError;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

// --- Data structures for frame information ---

/// One color image and one depth image captured at (approximately) the same instant.
#[derive(Debug, Clone)]
pub struct FramePair {
    pub color: Array3<u8>,  // (height, width, 3), BGR8
    pub depth: Array2<u16>, // (height, width), Z16
    pub timestamp_ms: f64,
}

impl FramePair {
    pub fn new(color: Array3<u8>, depth: Array2<u16>, timestamp_ms: f64) -> Self {
        FramePair { color, depth, timestamp_ms }
    }

    /// Solid BGR color with a constant depth value, handy for test patterns.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3], depth: u16, timestamp_ms: f64) -> Self {
        let (w, h) = (width as usize, height as usize);
        let color = Array3::from_shape_fn((h, w, 3), |(_, _, c)| bgr[c]);
        let depth = Array2::from_elem((h, w), depth);
        FramePair { color, depth, timestamp_ms }
    }

    pub fn width(&self) -> u32 {
        self.color.dim().1 as u32
    }

    pub fn height(&self) -> u32 {
        self.color.dim().0 as u32
    }

    /// Checks that both images match the session geometry.
    pub fn check_shape(&self, width: u32, height: u32) -> Result<(), AppError> {
        let (w, h) = (width as usize, height as usize);
        if self.color.dim() != (h, w, 3) {
            return Err(AppError::FrameShapeMismatch {
                expected: format!("color {}x{}x3", h, w),
                actual: format!("color {:?}", self.color.dim()),
            });
        }
        if self.depth.dim() != (h, w) {
            return Err(AppError::FrameShapeMismatch {
                expected: format!("depth {}x{}", h, w),
                actual: format!("depth {:?}", self.depth.dim()),
            });
        }
        Ok(())
    }
}

/// Result of one wait-for-frames cycle.
#[derive(Debug)]
pub enum Captured {
    Frame(FramePair),
    /// The device delivered an incomplete pair (missing color or depth).
    Dropped,
}

/// Pinhole intrinsics of one stream as stored in the clip manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamIntrinsics {
    pub coeffs: Vec<f32>,
    pub fx: f32,
    pub fy: f32,
    pub height: u32,
    pub model: String,
    pub ppx: f32,
    pub ppy: f32,
    pub width: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraIntrinsics {
    pub color: Option<StreamIntrinsics>,
    pub depth: Option<StreamIntrinsics>,
}

impl CameraIntrinsics {
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.depth.is_none()
    }
}

// --- The FrameSource Trait ---

pub trait FrameSource {
    fn get_name(&self) -> String;

    /// (width, height) every pair from this source will have.
    fn resolution(&self) -> (u32, u32);

    /// Blocks until the next pair arrives or the device reports a drop.
    fn next_pair(&mut self) -> Result<Captured, AppError>;

    fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics::default()
    }

    /// Releases the device. Must be safe to call more than once.
    fn stop(&mut self);
}
