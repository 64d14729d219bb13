use crate::camera::camera_media::{color_to_mat, depth_to_mat};
use crate::core::capture_source::FramePair;
use crate::errors::AppError;
use crate::session_config::DisplayMethod;
use log::debug;
use ndarray::ArrayView2;
use opencv::{
    core::{self as opencv_core, Mat, Point, Scalar, Size, Vector},
    highgui, imgproc,
    prelude::*,
};

const KEY_ESC: i32 = 27;
const TOP_BAR_HEIGHT: i32 = 56;

/// Keys understood by the preview windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Record,
    Abort,
    Quit,
    StepBack,
    StepForward,
}

impl KeyCommand {
    /// Maps a `wait_key` code; negative codes mean no key was pressed.
    pub fn from_key_code(code: i32) -> Option<Self> {
        if code < 0 {
            return None;
        }
        match code & 0xff {
            KEY_ESC => Some(KeyCommand::Quit),
            k if k == 'r' as i32 => Some(KeyCommand::Record),
            k if k == 'c' as i32 => Some(KeyCommand::Abort),
            k if k == 'a' as i32 => Some(KeyCommand::StepBack),
            k if k == 'd' as i32 => Some(KeyCommand::StepForward),
            _ => None,
        }
    }
}

/// Status line drawn above the live preview.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub width: u32,
    pub height: u32,
    pub actual_fps: f64,
    pub frequency: u32,
    pub elapsed_secs: f64,
    pub duration_secs: f64,
    pub state_label: &'static str,
}

impl Overlay {
    pub fn text(&self) -> String {
        format!(
            "{}x{} {:.1}/{}fps {:.2}/{:.2}s {}",
            self.width,
            self.height,
            self.actual_fps,
            self.frequency,
            self.elapsed_secs,
            self.duration_secs,
            self.state_label
        )
    }
}

/// Renders live frame pairs and reports the key pressed, if any.
pub trait PreviewSink {
    fn show(&mut self, pair: &FramePair, overlay: &Overlay) -> Result<Option<KeyCommand>, AppError>;
    fn close(&mut self);
}

pub struct OpenCvPreview {
    window: String,
    display: DisplayMethod,
    preview_size: Size,
    depth_alpha: f64,
}

impl OpenCvPreview {
    pub fn new(
        window: &str,
        display: DisplayMethod,
        preview_width: u32,
        preview_height: u32,
        depth_alpha: f64,
    ) -> Result<Self, AppError> {
        highgui::named_window(window, highgui::WINDOW_AUTOSIZE)?;
        debug!("🪟 Opened preview window '{}' ({:?}, {}x{})", window, display, preview_width, preview_height);
        Ok(OpenCvPreview {
            window: window.to_string(),
            display,
            preview_size: Size::new(preview_width as i32, preview_height as i32),
            depth_alpha,
        })
    }
}

impl PreviewSink for OpenCvPreview {
    fn show(&mut self, pair: &FramePair, overlay: &Overlay) -> Result<Option<KeyCommand>, AppError> {
        let color = resize_nearest(&color_to_mat(pair.color.view())?, self.preview_size)?;
        let depth = resize_nearest(&depth_to_mat(pair.depth.view())?, self.preview_size)?;
        let colormap = depth_colormap(&depth, self.depth_alpha)?;
        let body = compose(&color, &colormap, self.display, ColorPosition::Top)?;

        let mut top_bar = Mat::new_rows_cols_with_default(
            TOP_BAR_HEIGHT,
            self.preview_size.width,
            opencv_core::CV_8UC3,
            Scalar::all(0.0),
        )?;
        draw_label(&mut top_bar, &overlay.text(), Point::new(10, 50))?;

        let mut canvas = Mat::default();
        let mut parts = Vector::<Mat>::new();
        parts.push(top_bar);
        parts.push(body);
        opencv_core::vconcat(&parts, &mut canvas)?;
        highgui::imshow(&self.window, &canvas)?;
        poll_key(1)
    }

    fn close(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.window) {
            debug!("Preview window '{}' was already gone: {}", self.window, e);
        }
    }
}

/// Where the color frame sits when stacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPosition {
    Top,
    Bottom,
}

pub fn poll_key(delay_ms: i32) -> Result<Option<KeyCommand>, AppError> {
    Ok(KeyCommand::from_key_code(highgui::wait_key(delay_ms)?))
}

pub fn resize_nearest(src: &Mat, size: Size) -> Result<Mat, AppError> {
    if src.size()? == size {
        return Ok(src.try_clone()?);
    }
    let mut dst = Mat::default();
    imgproc::resize(src, &mut dst, size, 0.0, 0.0, imgproc::INTER_NEAREST)?;
    Ok(dst)
}

/// Scales 16-bit depth into 8 bits and applies the JET colormap.
pub fn depth_colormap(depth: &Mat, alpha: f64) -> Result<Mat, AppError> {
    let mut scaled = Mat::default();
    opencv_core::convert_scale_abs(depth, &mut scaled, alpha, 0.0)?;
    let mut colormap = Mat::default();
    imgproc::apply_color_map(&scaled, &mut colormap, imgproc::COLORMAP_JET)?;
    Ok(colormap)
}

pub fn compose(color: &Mat, colormap: &Mat, display: DisplayMethod, position: ColorPosition) -> Result<Mat, AppError> {
    let mut out = Mat::default();
    match display {
        DisplayMethod::Stack => {
            let (first, second) = match position {
                ColorPosition::Top => (color, colormap),
                ColorPosition::Bottom => (colormap, color),
            };
            opencv_core::vconcat2(first, second, &mut out)?;
        }
        DisplayMethod::Blend => {
            // JET maps zero depth to (128,0,0); mask those pixels out before blending.
            let no_depth = Scalar::new(128.0, 0.0, 0.0, 0.0);
            let mut zero_mask = Mat::default();
            opencv_core::in_range(colormap, &no_depth, &no_depth, &mut zero_mask)?;
            let mut keep_mask = Mat::default();
            opencv_core::bitwise_not(&zero_mask, &mut keep_mask, &opencv_core::no_array())?;
            let mut masked = Mat::default();
            opencv_core::bitwise_and(colormap, colormap, &mut masked, &keep_mask)?;
            opencv_core::add_weighted(color, 0.5, &masked, 0.5, 0.0, &mut out, -1)?;
        }
    }
    Ok(out)
}

/// Playback view of a saved frame: depth colormap above the color image (or blended).
pub fn render_clip_frame(
    color: &Mat,
    depth: ArrayView2<'_, u16>,
    display: DisplayMethod,
    alpha: f64,
) -> Result<Mat, AppError> {
    let colormap = depth_colormap(&depth_to_mat(depth)?, alpha)?;
    compose(color, &colormap, display, ColorPosition::Bottom)
}

pub fn draw_label(image: &mut Mat, text: &str, origin: Point) -> Result<(), AppError> {
    imgproc::put_text(
        image,
        text,
        origin,
        imgproc::FONT_HERSHEY_PLAIN,
        2.0,
        Scalar::new(0.0, 0.0, 200.0, 0.0),
        3,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}
