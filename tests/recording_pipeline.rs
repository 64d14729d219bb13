mod common;

use common::{failing_writer, raw_writer, read_all_colors, ScriptedPreview};
use rsrec::camera::preview::KeyCommand;
use rsrec::camera::synthetic_device::SyntheticSource;
use rsrec::core::capture_loop::{CaptureLoop, CaptureSummary};
use rsrec::errors::AppError;
use rsrec::persist::clip_writer::ClipWriter;
use rsrec::persist::depth_store::load_depth_npz;
use rsrec::persist::manifest::ClipManifest;
use rsrec::session_config::SessionConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const W: u32 = 16;
const H: u32 = 8;
const RED: [u8; 3] = [0, 0, 255];

fn run(
    source: SyntheticSource,
    preview: ScriptedPreview,
    session: SessionConfig,
    out: &Path,
    max_drops: usize,
) -> Result<CaptureSummary, AppError> {
    run_with_writer(source, preview, session, raw_writer(out), max_drops)
}

fn run_with_writer(
    source: SyntheticSource,
    preview: ScriptedPreview,
    session: SessionConfig,
    writer: Arc<ClipWriter>,
    max_drops: usize,
) -> Result<CaptureSummary, AppError> {
    let rt = Runtime::new().unwrap();
    CaptureLoop::new(source, preview, session, writer, rt.handle().clone(), max_drops).run()
}

fn two_second_session() -> SessionConfig {
    SessionConfig::new(W, H, 30, 2.0).unwrap()
}

fn json_files(dir: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect()
}

#[test]
fn full_session_writes_exactly_capacity_frames() {
    let dir = tempfile::tempdir().unwrap();
    let source = SyntheticSource::new(W, H, RED, 500);
    let preview = ScriptedPreview::new(&[(1, KeyCommand::Record), (70, KeyCommand::Quit)]);

    let summary = run(source, preview, two_second_session(), dir.path(), 30).unwrap();

    assert_eq!(summary.frames_seen, 70);
    assert_eq!(summary.clips.len(), 1);
    let clip = &summary.clips[0];
    assert_eq!(clip.time_sec, 2.0);
    assert_eq!(clip.frequency, 30);
    assert_eq!((clip.width, clip.height), (W, H));

    let depths = load_depth_npz(&clip.depth_path(dir.path())).unwrap();
    assert_eq!(depths.dim(), (60, H as usize, W as usize));
    assert!(depths.iter().all(|&d| d == 500));

    let colors = read_all_colors(&clip.color_path(dir.path()));
    assert_eq!(colors.len(), 60);
    assert!(colors.iter().all(|f| f.indexed_iter().all(|((_, _, c), &v)| v == RED[c])));

    let json_path = dir.path().join(format!("{}.json", clip.time));
    let (on_disk, _) = ClipManifest::load(&json_path).unwrap();
    assert_eq!(&on_disk, clip);
}

#[test]
fn dropped_pairs_never_reach_the_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let source = SyntheticSource::new(W, H, RED, 500).with_drop_every(3);
    let preview = ScriptedPreview::new(&[(1, KeyCommand::Record), (70, KeyCommand::Quit)]);

    let summary = run(source, preview, two_second_session(), dir.path(), 30).unwrap();

    assert_eq!(summary.frames_seen, 70);
    assert_eq!(summary.frames_dropped, 34);
    let clip = &summary.clips[0];
    assert_eq!(load_depth_npz(&clip.depth_path(dir.path())).unwrap().dim().0, 60);
    assert_eq!(read_all_colors(&clip.color_path(dir.path())).len(), 60);
}

#[test]
fn quitting_mid_session_keeps_only_captured_frames() {
    let dir = tempfile::tempdir().unwrap();
    let source = SyntheticSource::new(W, H, RED, 500);
    let preview = ScriptedPreview::new(&[(1, KeyCommand::Record), (21, KeyCommand::Quit)]);

    let summary = run(source, preview, two_second_session(), dir.path(), 30).unwrap();

    assert_eq!(summary.clips.len(), 1);
    let clip = &summary.clips[0];
    assert!((clip.time_sec - 20.0 / 30.0).abs() < 1e-9);
    assert_eq!(clip.frame_count(), 20);
    assert_eq!(load_depth_npz(&clip.depth_path(dir.path())).unwrap().dim().0, 20);
    assert_eq!(read_all_colors(&clip.color_path(dir.path())).len(), 20);
}

#[test]
fn cancelled_session_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = SyntheticSource::new(W, H, RED, 500);
    let preview = ScriptedPreview::new(&[(1, KeyCommand::Record), (11, KeyCommand::Abort), (30, KeyCommand::Quit)]);

    let summary = run(source, preview, two_second_session(), dir.path(), 30).unwrap();

    assert!(summary.clips.is_empty());
    assert_eq!(summary.discarded_sessions, 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn second_session_can_start_after_first_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionConfig::new(W, H, 10, 0.5).unwrap();
    let source = SyntheticSource::new(W, H, RED, 500);
    // Shows 2..=6 fill the first session; the pause gives its persister time to finish.
    let preview = ScriptedPreview::new(&[(1, KeyCommand::Record), (20, KeyCommand::Record), (40, KeyCommand::Quit)])
        .pause_at(10, Duration::from_secs(2));

    let summary = run(source, preview, session, dir.path(), 30).unwrap();

    assert_eq!(summary.clips.len(), 2);
    assert_eq!(summary.persist_failures, 0);
    assert!(summary.clips.iter().all(|c| c.frame_count() == 5));
    assert_eq!(json_files(dir.path()).len(), 2);
}

#[test]
fn failed_save_is_counted_and_recording_continues() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionConfig::new(W, H, 10, 0.5).unwrap();
    let source = SyntheticSource::new(W, H, RED, 500);
    // Each session fills in five shows; the pauses let the failing save be reaped before the next 'r'.
    let preview = ScriptedPreview::new(&[(1, KeyCommand::Record), (20, KeyCommand::Record), (40, KeyCommand::Quit)])
        .pause_at(10, Duration::from_secs(2))
        .pause_at(30, Duration::from_secs(2));

    let summary = run_with_writer(source, preview, session, failing_writer(dir.path()), 30).unwrap();

    assert_eq!(summary.persist_failures, 2);
    assert!(summary.clips.is_empty());
    assert_eq!(summary.discarded_sessions, 0);
    assert_eq!(summary.frames_seen, 40);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn countdown_delays_the_first_recorded_frame() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionConfig::new(W, H, 10, 0.5).unwrap().with_countdown(0.3);
    let source = SyntheticSource::new(W, H, RED, 500);
    let preview = ScriptedPreview::new(&[(1, KeyCommand::Record), (20, KeyCommand::Quit)]);

    let summary = run(source, preview, session, dir.path(), 30).unwrap();

    assert_eq!(summary.clips.len(), 1);
    assert_eq!(summary.clips[0].frame_count(), 5);
}

#[test]
fn too_many_consecutive_drops_is_a_device_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = SyntheticSource::new(W, H, RED, 500).with_drop_every(1);
    let preview = ScriptedPreview::new(&[]);

    let err = run(source, preview, two_second_session(), dir.path(), 5).unwrap_err();
    assert!(matches!(err, AppError::Device(_)), "{:?}", err);
}

#[test]
fn unsupported_resolution_fails_before_any_session_exists() {
    let err = SessionConfig::from_request(Some(1280), Some(480), 30, 2.0).unwrap_err();
    assert!(matches!(err, AppError::UnsupportedResolution { width: 1280, height: Some(480) }));
    assert_eq!(err.to_string(), "Not Supported Resolution: (1280,480)");
}
