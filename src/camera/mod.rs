pub mod camera_media;
pub mod preview;
pub mod synthetic_device;
#[cfg(feature = "realsense")]
pub mod realsense_device;
