use crate::core::capture_source::FramePair;
use crate::errors::AppError;
use ndarray::{s, Array3, Array4, ArrayView3, ArrayView4, Axis};

/// Fixed-capacity storage for one session's color and depth frames.
///
/// Index `i` of `colors` and `depths` always refers to the same temporal sample.
#[derive(Debug)]
pub struct RecordingBuffer {
    colors: Array4<u8>,  // (n, h, w, 3)
    depths: Array3<u16>, // (n, h, w)
    width: u32,
    height: u32,
    frames_written: usize,
}

impl RecordingBuffer {
    pub fn allocate(capacity: usize, width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        RecordingBuffer {
            colors: Array4::zeros((capacity, h, w, 3)),
            depths: Array3::zeros((capacity, h, w)),
            width,
            height,
            frames_written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.colors.len_of(Axis(0))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// High-water mark: one past the last slot that holds real data.
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn is_full(&self) -> bool {
        self.frames_written >= self.capacity()
    }

    pub fn write(&mut self, index: usize, pair: &FramePair) -> Result<(), AppError> {
        if index >= self.capacity() {
            return Err(AppError::BufferIndexOutOfRange {
                index,
                capacity: self.capacity(),
            });
        }
        pair.check_shape(self.width, self.height)?;
        self.colors.index_axis_mut(Axis(0), index).assign(&pair.color);
        self.depths.index_axis_mut(Axis(0), index).assign(&pair.depth);
        self.frames_written = self.frames_written.max(index + 1);
        Ok(())
    }

    /// Appends after the last written slot and returns the index used.
    pub fn push(&mut self, pair: &FramePair) -> Result<usize, AppError> {
        let index = self.frames_written;
        self.write(index, pair)?;
        Ok(index)
    }

    /// All slots, including any never written (still zero).
    pub fn read_all(&self) -> (ArrayView4<'_, u8>, ArrayView3<'_, u16>) {
        (self.colors.view(), self.depths.view())
    }

    /// Only the slots that hold recorded frames.
    pub fn filled(&self) -> (ArrayView4<'_, u8>, ArrayView3<'_, u16>) {
        let n = self.frames_written;
        (
            self.colors.slice(s![..n, .., .., ..]),
            self.depths.slice(s![..n, .., ..]),
        )
    }
}
