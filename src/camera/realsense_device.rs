use crate::app_config::DeviceConfig;
use crate::core::capture_source::{CameraIntrinsics, Captured, FramePair, FrameSource, StreamIntrinsics};
use crate::errors::AppError;
use crate::session_config::SessionConfig;
use log::{debug, info, warn};
use ndarray::{Array2, Array3};
use realsense_rust::{
    config::Config as RsConfig,
    context::Context as RsContext,
    frame::{ColorFrame, CompositeFrame, DepthFrame, FrameEx},
    kind::{Rs2CameraInfo, Rs2Format, Rs2StreamKind},
    pipeline::{ActivePipeline as RsActivePipeline, InactivePipeline as RsInactivePipeline},
    stream_profile::StreamProfile,
};
use std::collections::HashSet;
use std::ffi::CString;
use std::time::{Duration, Instant};

/// Live color (BGR8) + depth (Z16) stream from one RealSense device.
///
/// The pipeline is not `Send`; create this on the thread that runs the capture loop.
pub struct RealsenseDevice {
    name: String,
    width: u32,
    height: u32,
    timeout: Duration,
    capture_intrinsics: bool,
    pipeline: Option<RsActivePipeline>,
    intrinsics: CameraIntrinsics,
    started: Instant,
}

impl RealsenseDevice {
    pub fn open(session: &SessionConfig, device: &DeviceConfig, timeout: Duration) -> Result<Self, AppError> {
        let open_start = Instant::now();
        let context =
            RsContext::new().map_err(|e| AppError::Device(format!("Failed to create Realsense context: {}", e)))?;
        let device_list = context.query_devices(HashSet::new());
        if device_list.is_empty() {
            return Err(AppError::Device("No Realsense devices found.".to_string()));
        }

        let serials: Vec<String> = device_list
            .iter()
            .filter_map(|dev| dev.info(Rs2CameraInfo::SerialNumber))
            .filter_map(|cstr| cstr.to_str().ok().map(str::to_string))
            .collect();
        let serial = match &device.serial_number {
            Some(wanted) => serials
                .iter()
                .find(|s| *s == wanted)
                .cloned()
                .ok_or_else(|| {
                    AppError::Device(format!("Specified device S/N '{}' not found (have {:?}).", wanted, serials))
                })?,
            None => serials
                .first()
                .cloned()
                .ok_or_else(|| AppError::Device("Could not read the serial number of any device.".to_string()))?,
        };
        info!("📷 RS: Using device S/N {}", serial);

        let inactive_pipeline = RsInactivePipeline::try_from(&context)
            .map_err(|e| AppError::Device(format!("Failed to create inactive pipeline: {}", e)))?;
        let mut rs_config = RsConfig::new();
        let c_serial = CString::new(serial.clone())
            .map_err(|e| AppError::Device(format!("Invalid serial '{}': {}", serial, e)))?;
        rs_config
            .enable_device_from_serial(c_serial.as_c_str())
            .map_err(|e| AppError::Device(format!("Failed to enable device S/N '{}': {}", serial, e)))?
            .disable_all_streams()
            .map_err(|e| AppError::Device(format!("Failed to reset streams: {}", e)))?;

        let (w, h, fps) = (session.width as usize, session.height as usize, session.frequency as usize);
        rs_config
            .enable_stream(Rs2StreamKind::Color, None, w, h, Rs2Format::Bgr8, fps)
            .map_err(|e| AppError::Device(format!("Failed to enable color stream ({}x{}@{} BGR8): {}", w, h, fps, e)))?
            .enable_stream(Rs2StreamKind::Depth, None, w, h, Rs2Format::Z16, fps)
            .map_err(|e| AppError::Device(format!("Failed to enable depth stream ({}x{}@{} Z16): {}", w, h, fps, e)))?;

        let pipeline = inactive_pipeline
            .start(Some(rs_config))
            .map_err(|e| AppError::Device(format!("Failed to start pipeline: {}", e)))?;
        info!("✅ RS: Streaming {}x{}@{}fps from S/N {} (opened in {:?})", w, h, fps, serial, open_start.elapsed());

        Ok(RealsenseDevice {
            name: format!("realsense-{}", serial),
            width: session.width,
            height: session.height,
            timeout,
            capture_intrinsics: session.capture_intrinsics,
            pipeline: Some(pipeline),
            intrinsics: CameraIntrinsics::default(),
            started: Instant::now(),
        })
    }

    fn record_intrinsics(&mut self, color: &ColorFrame, depth: &DepthFrame) {
        if !self.capture_intrinsics || !self.intrinsics.is_empty() {
            return;
        }
        self.intrinsics = CameraIntrinsics {
            color: stream_intrinsics(color.stream_profile()),
            depth: stream_intrinsics(depth.stream_profile()),
        };
        debug!("RS: Captured intrinsics {:?}", self.intrinsics);
    }
}

fn stream_intrinsics(profile: &StreamProfile) -> Option<StreamIntrinsics> {
    match profile.intrinsics() {
        Ok(i) => {
            let distortion = i.distortion();
            Some(StreamIntrinsics {
                coeffs: distortion.coeffs.to_vec(),
                fx: i.fx(),
                fy: i.fy(),
                height: i.height() as u32,
                model: format!("{:?}", distortion.model),
                ppx: i.ppx(),
                ppy: i.ppy(),
                width: i.width() as u32,
            })
        }
        Err(e) => {
            warn!("RS: Intrinsics unavailable for {:?} stream: {}", profile.kind(), e);
            None
        }
    }
}

fn copy_color(frame: &ColorFrame) -> Option<Array3<u8>> {
    let (w, h) = (frame.width(), frame.height());
    if frame.bits_per_pixel() / 8 != 3 {
        warn!("RS: Color frame BPP is {}, expected 24 (BGR8).", frame.bits_per_pixel());
        return None;
    }
    let len = w * h * 3;
    let raw_data_ptr: *const std::os::raw::c_void = unsafe { frame.get_data() };
    let data = unsafe { std::slice::from_raw_parts(raw_data_ptr as *const u8, len) };
    Array3::from_shape_vec((h, w, 3), data.to_vec()).ok()
}

fn copy_depth(frame: &DepthFrame) -> Option<Array2<u16>> {
    let (w, h) = (frame.width(), frame.height());
    if frame.bits_per_pixel() / 8 != 2 {
        warn!("RS: Depth frame BPP is {}, expected 16 (Z16).", frame.bits_per_pixel());
        return None;
    }
    let raw_data_ptr: *const std::os::raw::c_void = unsafe { frame.get_data() };
    let bytes = unsafe { std::slice::from_raw_parts(raw_data_ptr as *const u8, w * h * 2) };
    depth_from_z16(bytes, w, h)
}

/// Native-endian Z16 bytes to an `(h, w)` depth image. The input need not be 2-byte aligned.
fn depth_from_z16(bytes: &[u8], w: usize, h: usize) -> Option<Array2<u16>> {
    if bytes.len() != w * h * 2 {
        return None;
    }
    let samples: Vec<u16> = bytemuck::pod_collect_to_vec(bytes);
    Array2::from_shape_vec((h, w), samples).ok()
}

impl FrameSource for RealsenseDevice {
    fn get_name(&self) -> String {
        self.name.clone()
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_pair(&mut self) -> Result<Captured, AppError> {
        let pipeline = self
            .pipeline
            .as_mut()
            .ok_or_else(|| AppError::Device("Pipeline already stopped".to_string()))?;

        let frameset: CompositeFrame = match pipeline.wait(Some(self.timeout)) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("RS [{}]: Wait for frames failed: {}", self.name, e);
                return Ok(Captured::Dropped);
            }
        };

        let color_frames: Vec<ColorFrame> = frameset.frames_of_type::<ColorFrame>();
        let depth_frames: Vec<DepthFrame> = frameset.frames_of_type::<DepthFrame>();
        let (color_frame, depth_frame) = match (color_frames.first(), depth_frames.first()) {
            (Some(c), Some(d)) => (c, d),
            _ => return Ok(Captured::Dropped),
        };

        let (color, depth) = match (copy_color(color_frame), copy_depth(depth_frame)) {
            (Some(c), Some(d)) => (c, d),
            _ => return Ok(Captured::Dropped),
        };
        self.record_intrinsics(color_frame, depth_frame);

        let timestamp_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        Ok(Captured::Frame(FramePair::new(color, depth, timestamp_ms)))
    }

    fn intrinsics(&self) -> CameraIntrinsics {
        self.intrinsics.clone()
    }

    fn stop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            info!("RS [{}]: Stopping pipeline...", self.name);
            pipeline.stop();
            info!("RS [{}]: Pipeline stopped.", self.name);
        }
    }
}

impl Drop for RealsenseDevice {
    fn drop(&mut self) {
        self.stop();
    }
}
