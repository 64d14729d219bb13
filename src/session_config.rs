use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMethod {
    Stack,
    Blend,
}

impl Default for DisplayMethod {
    fn default() -> Self {
        Self::Stack
    }
}

impl FromStr for DisplayMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stack" => Ok(DisplayMethod::Stack),
            "blend" => Ok(DisplayMethod::Blend),
            other => Err(AppError::Config(format!(
                "Unknown display method '{}', expected 'stack' or 'blend'",
                other
            ))),
        }
    }
}

/// Everything one recording session needs to know about geometry and timing.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub width: u32,
    pub height: u32,
    pub frequency: u32,
    pub duration_secs: f64,
    pub display: DisplayMethod,
    pub countdown_secs: f64, // 0 disables the countdown
    pub capture_intrinsics: bool,
}

impl SessionConfig {
    pub fn new(width: u32, height: u32, frequency: u32, duration_secs: f64) -> Result<Self, AppError> {
        if width == 0 || height == 0 {
            return Err(AppError::Config(format!("Invalid frame size {}x{}", width, height)));
        }
        if frequency == 0 {
            return Err(AppError::Config("Frequency must be at least 1 Hz".to_string()));
        }
        if !(duration_secs > 0.0) || !duration_secs.is_finite() {
            return Err(AppError::Config(format!(
                "Recording time must be a positive number of seconds, got {}",
                duration_secs
            )));
        }
        let config = SessionConfig {
            width,
            height,
            frequency,
            duration_secs,
            display: DisplayMethod::default(),
            countdown_secs: 0.0,
            capture_intrinsics: false,
        };
        if config.capacity() == 0 {
            return Err(AppError::Config(format!(
                "{}s at {}Hz is shorter than one frame",
                duration_secs, frequency
            )));
        }
        Ok(config)
    }

    /// Builds a session from user-requested values, resolving the resolution
    /// against the device's supported table before anything is opened.
    pub fn from_request(
        width: Option<u32>,
        height: Option<u32>,
        frequency: u32,
        duration_secs: f64,
    ) -> Result<Self, AppError> {
        let (width, height) = resolve_resolution(width, height)?;
        Self::new(width, height, frequency, duration_secs)
    }

    pub fn with_display(mut self, display: DisplayMethod) -> Self {
        self.display = display;
        self
    }

    pub fn with_countdown(mut self, countdown_secs: f64) -> Self {
        self.countdown_secs = countdown_secs.max(0.0);
        self
    }

    pub fn with_intrinsics(mut self, capture: bool) -> Self {
        self.capture_intrinsics = capture;
        self
    }

    /// Number of frame pairs a full session holds.
    pub fn capacity(&self) -> usize {
        (self.frequency as f64 * self.duration_secs).round() as usize
    }

    pub fn countdown_frames(&self) -> u32 {
        (self.countdown_secs * self.frequency as f64).round() as u32
    }

    pub fn seconds_for(&self, frames: usize) -> f64 {
        frames as f64 / self.frequency as f64
    }
}

/// The depth camera only streams a handful of color/depth resolutions.
pub fn resolve_resolution(width: Option<u32>, height: Option<u32>) -> Result<(u32, u32), AppError> {
    match (width, height) {
        (None, None) => Ok((640, 360)),
        (Some(424), None) | (Some(424), Some(240)) => Ok((424, 240)),
        (Some(640), None) => Ok((640, 360)),
        (Some(640), Some(h)) if h == 360 || h == 480 => Ok((640, h)),
        (Some(848), None) | (Some(848), Some(480)) => Ok((848, 480)),
        (Some(1280), None) | (Some(1280), Some(720)) => Ok((1280, 720)),
        (w, h) => Err(AppError::UnsupportedResolution {
            width: w.unwrap_or(0),
            height: h,
        }),
    }
}
