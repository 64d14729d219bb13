use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApplicationConfig {
    pub output_directory: String,
    pub video_codec: String,     // fourcc, e.g. "MJPG", "mp4v", "XVID"
    pub video_extension: String, // container, e.g. "avi"
    pub filename_timestamp_format: String, // strftime format string
    pub clip_id_prefix: String,  // prepended to ids of trimmed clips
    pub log_level: Option<String>,
    pub countdown_seconds: f64,
    pub preview_width: u32,
    pub preview_height: u32,
    pub depth_colormap_alpha: f64,
    pub max_consecutive_dropped_frames: u32,
    pub frame_timeout_ms: u64,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        ApplicationConfig {
            output_directory: ".".to_string(),
            video_codec: "MJPG".to_string(),
            video_extension: "avi".to_string(),
            filename_timestamp_format: "%Y-%m-%d-%H-%M-%S".to_string(),
            clip_id_prefix: "c".to_string(),
            log_level: Some("info".to_string()),
            countdown_seconds: 3.0,
            preview_width: 640,
            preview_height: 360,
            depth_colormap_alpha: 0.08,
            max_consecutive_dropped_frames: 30,
            frame_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceConfig {
    pub serial_number: Option<String>, // first device found when unset
    pub capture_intrinsics: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            serial_number: None,
            capture_intrinsics: true,
        }
    }
}
