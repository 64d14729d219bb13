use crate::core::capture_source::{Captured, FramePair, FrameSource};
use crate::errors::AppError;
use log::info;
use std::time::{Duration, Instant};

/// Test-pattern source: a solid color and a constant depth plane.
///
/// Can be told to pace itself at a frame rate and to report every n-th
/// cycle as a dropped pair.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    bgr: [u8; 3],
    depth: u16,
    drop_every: Option<usize>,
    frame_interval: Option<Duration>,
    cycles: usize,
    started: Option<Instant>,
    stopped: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, bgr: [u8; 3], depth: u16) -> Self {
        SyntheticSource {
            width,
            height,
            bgr,
            depth,
            drop_every: None,
            frame_interval: None,
            cycles: 0,
            started: None,
            stopped: false,
        }
    }

    /// Report every `n`-th wait cycle as a dropped pair.
    pub fn with_drop_every(mut self, n: usize) -> Self {
        self.drop_every = if n == 0 { None } else { Some(n) };
        self
    }

    /// Sleep between frames to imitate a camera running at `frequency` Hz.
    pub fn paced(mut self, frequency: u32) -> Self {
        self.frame_interval = Some(Duration::from_secs_f64(1.0 / frequency.max(1) as f64));
        self
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }
}

impl FrameSource for SyntheticSource {
    fn get_name(&self) -> String {
        "SyntheticSource".to_string()
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_pair(&mut self) -> Result<Captured, AppError> {
        if self.stopped {
            return Err(AppError::Device("Synthetic source was stopped".to_string()));
        }
        let started = *self.started.get_or_insert_with(Instant::now);
        if let Some(interval) = self.frame_interval {
            let due = started + interval * self.cycles as u32;
            if let Some(wait) = due.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
        }
        self.cycles += 1;
        if matches!(self.drop_every, Some(n) if self.cycles % n == 0) {
            return Ok(Captured::Dropped);
        }
        let timestamp_ms = started.elapsed().as_secs_f64() * 1000.0;
        Ok(Captured::Frame(FramePair::filled(
            self.width,
            self.height,
            self.bgr,
            self.depth,
            timestamp_ms,
        )))
    }

    fn stop(&mut self) {
        if !self.stopped {
            info!("🛑 Synthetic source stopped after {} cycle(s).", self.cycles);
            self.stopped = true;
        }
    }
}
