use crate::app_config::{ApplicationConfig, DeviceConfig};
use crate::camera::preview::OpenCvPreview;
use crate::camera::synthetic_device::SyntheticSource;
use crate::config_loader::MasterConfig;
use crate::core::capture_loop::{CaptureLoop, CaptureSummary};
use crate::core::capture_source::FrameSource;
use crate::operations::op_helper;
use crate::persist::clip_writer::ClipWriter;
use crate::session_config::SessionConfig;
use anyhow::{Context, Result};
use clap::ArgMatches;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;

const PREVIEW_WINDOW: &str = "rsrec";

pub async fn handle_record_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let op_start_time = Instant::now();
    let operation_display_name = "Record";
    let app = &master_config.app_settings;

    let frequency = args.get_one::<u32>("freq").copied().unwrap_or(30);
    let duration_secs = args.get_one::<f64>("time").copied().unwrap_or(10.0);
    let countdown_secs = if args.get_flag("countdown") { app.countdown_seconds } else { 0.0 };
    let session = SessionConfig::from_request(
        args.get_one::<u32>("width").copied(),
        args.get_one::<u32>("height").copied(),
        frequency,
        duration_secs,
    )
    .context("Invalid recording request")?
    .with_display(op_helper::display_method(args)?)
    .with_countdown(countdown_secs)
    .with_intrinsics(master_config.device.capture_intrinsics);
    debug!("Record CLI resolved session: {:?}", session);

    let output_dir = op_helper::determine_operation_output_dir(master_config, args, "output", operation_display_name)?;
    let writer = Arc::new(ClipWriter::new(
        output_dir,
        op_helper::video_codec(app)?,
        &app.filename_timestamp_format,
    ));

    let synthetic = args.get_flag("synthetic");
    let app = app.clone();
    let device = master_config.device.clone();
    let summary = op_helper::run_blocking(operation_display_name, move || {
        let runtime = Handle::current();
        if synthetic {
            let source = SyntheticSource::new(session.width, session.height, [0, 0, 255], 500).paced(session.frequency);
            run_capture(source, session, writer, runtime, &app)
        } else {
            open_device_and_run(session, writer, runtime, &app, &device)
        }
    })
    .await?;

    if summary.persist_failures > 0 {
        warn!("⚠️ {} clip(s) failed to save. Please check logs.", summary.persist_failures);
    }
    for clip in &summary.clips {
        info!("  -> {} ({:.2}s)", clip.time, clip.time_sec);
    }
    info!(
        "✅ '{}' finished in {:?}: {} clip(s) saved, {} discarded.",
        operation_display_name,
        op_start_time.elapsed(),
        summary.clips.len(),
        summary.discarded_sessions
    );
    Ok(())
}

fn run_capture<S: FrameSource>(
    source: S,
    session: SessionConfig,
    writer: Arc<ClipWriter>,
    runtime: Handle,
    app: &ApplicationConfig,
) -> Result<CaptureSummary> {
    let preview = OpenCvPreview::new(
        PREVIEW_WINDOW,
        session.display,
        app.preview_width,
        app.preview_height,
        app.depth_colormap_alpha,
    )
    .context("Failed to open the preview window")?;
    let capture = CaptureLoop::new(
        source,
        preview,
        session,
        writer,
        runtime,
        app.max_consecutive_dropped_frames as usize,
    );
    Ok(capture.run()?)
}

#[cfg(feature = "realsense")]
fn open_device_and_run(
    session: SessionConfig,
    writer: Arc<ClipWriter>,
    runtime: Handle,
    app: &ApplicationConfig,
    device: &DeviceConfig,
) -> Result<CaptureSummary> {
    use crate::camera::realsense_device::RealsenseDevice;
    use std::time::Duration;

    let source = RealsenseDevice::open(&session, device, Duration::from_millis(app.frame_timeout_ms))
        .context("Failed to open the RealSense device")?;
    run_capture(source, session, writer, runtime, app)
}

#[cfg(not(feature = "realsense"))]
fn open_device_and_run(
    _session: SessionConfig,
    _writer: Arc<ClipWriter>,
    _runtime: Handle,
    _app: &ApplicationConfig,
    _device: &DeviceConfig,
) -> Result<CaptureSummary> {
    anyhow::bail!("rsrec was built without the 'realsense' feature; rebuild with it or pass --synthetic")
}
