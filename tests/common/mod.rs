#![allow(dead_code)]

use ndarray::{Array3, ArrayView4};
use rsrec::camera::camera_media::{FrameReader, VideoCodec};
use rsrec::camera::preview::{KeyCommand, Overlay, PreviewSink};
use rsrec::core::capture_source::FramePair;
use rsrec::errors::AppError;
use rsrec::persist::clip_writer::ClipWriter;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Lossless stand-in for a video container: a `[n, h, w]` u32 header followed by raw BGR bytes.
pub struct RawCodec;

impl VideoCodec for RawCodec {
    fn extension(&self) -> &str {
        "raw"
    }

    fn write_video(&self, path: &Path, frames: ArrayView4<'_, u8>, _fps: u32) -> Result<(), AppError> {
        let (n, h, w, _) = frames.dim();
        let mut bytes = Vec::with_capacity(12 + frames.len());
        for v in [n, h, w] {
            bytes.extend_from_slice(&(v as u32).to_le_bytes());
        }
        bytes.extend(frames.iter().copied());
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn open_reader(&self, path: &Path) -> Result<Box<dyn FrameReader>, AppError> {
        let bytes = std::fs::read(path)?;
        let header = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]) as usize;
        let (n, h, w) = (header(0), header(4), header(8));
        Ok(Box::new(RawReader { data: bytes[12..].to_vec(), frames: n, height: h, width: w, next: 0 }))
    }
}

struct RawReader {
    data: Vec<u8>,
    frames: usize,
    height: usize,
    width: usize,
    next: usize,
}

impl FrameReader for RawReader {
    fn read_next(&mut self) -> Result<Option<Array3<u8>>, AppError> {
        if self.next >= self.frames {
            return Ok(None);
        }
        let size = self.height * self.width * 3;
        let start = self.next * size;
        self.next += 1;
        let frame = Array3::from_shape_vec((self.height, self.width, 3), self.data[start..start + size].to_vec())
            .map_err(|e| AppError::Media(e.to_string()))?;
        Ok(Some(frame))
    }
}

/// Codec whose encoder always fails.
pub struct FailingCodec;

impl VideoCodec for FailingCodec {
    fn extension(&self) -> &str {
        "raw"
    }

    fn write_video(&self, _path: &Path, _frames: ArrayView4<'_, u8>, _fps: u32) -> Result<(), AppError> {
        Err(AppError::Media("encoder unavailable".to_string()))
    }

    fn open_reader(&self, _path: &Path) -> Result<Box<dyn FrameReader>, AppError> {
        Err(AppError::Media("decoder unavailable".to_string()))
    }
}

/// Preview that presses keys on given `show` calls (1-based) and remembers what it saw.
#[derive(Default)]
pub struct ScriptedPreview {
    keys: HashMap<usize, KeyCommand>,
    pauses: HashMap<usize, Duration>,
    pub shown: usize,
    pub labels: Vec<&'static str>,
    pub closed: bool,
}

impl ScriptedPreview {
    pub fn new(script: &[(usize, KeyCommand)]) -> Self {
        ScriptedPreview { keys: script.iter().copied().collect(), ..Default::default() }
    }

    /// Blocks the capture loop for `pause` on the given `show` call.
    pub fn pause_at(mut self, show: usize, pause: Duration) -> Self {
        self.pauses.insert(show, pause);
        self
    }
}

impl PreviewSink for ScriptedPreview {
    fn show(&mut self, _pair: &FramePair, overlay: &Overlay) -> Result<Option<KeyCommand>, AppError> {
        self.shown += 1;
        self.labels.push(overlay.state_label);
        if let Some(pause) = self.pauses.get(&self.shown) {
            std::thread::sleep(*pause);
        }
        Ok(self.keys.get(&self.shown).copied())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

pub fn raw_writer(dir: &Path) -> Arc<ClipWriter> {
    Arc::new(ClipWriter::new(dir, Arc::new(RawCodec), TIMESTAMP_FORMAT))
}

pub fn failing_writer(dir: &Path) -> Arc<ClipWriter> {
    Arc::new(ClipWriter::new(dir, Arc::new(FailingCodec), TIMESTAMP_FORMAT))
}

pub fn read_all_colors(path: &Path) -> Vec<Array3<u8>> {
    let mut reader = RawCodec.open_reader(path).unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = reader.read_next().unwrap() {
        frames.push(frame);
    }
    frames
}
