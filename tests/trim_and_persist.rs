mod common;

use common::{raw_writer, read_all_colors, FailingCodec, RawCodec, TIMESTAMP_FORMAT};
use ndarray::{Array3, Array4, Axis};
use rsrec::camera::camera_media::VideoCodec;
use rsrec::core::capture_source::{CameraIntrinsics, FramePair, StreamIntrinsics};
use rsrec::core::recording_buffer::RecordingBuffer;
use rsrec::errors::AppError;
use rsrec::persist::clip_writer::ClipWriter;
use rsrec::persist::depth_store::load_depth_npz;
use rsrec::persist::manifest::ClipManifest;
use rsrec::persist::persister::AsyncPersister;
use rsrec::persist::trimmer::trim;
use rsrec::session_config::SessionConfig;
use std::path::Path;
use std::sync::Arc;

const W: u32 = 6;
const H: u32 = 4;

/// Frame `i` has depth `i` everywhere and a color ramp seeded by `i`.
fn numbered_pair(i: usize) -> FramePair {
    let color = Array3::from_shape_fn((H as usize, W as usize, 3), |(y, x, c)| ((i * 7 + y * 3 + x + c) % 256) as u8);
    let depth = ndarray::Array2::from_elem((H as usize, W as usize), i as u16);
    FramePair::new(color, depth, i as f64)
}

fn sixty_frame_clip(dir: &Path) -> (ClipManifest, SessionConfig, RecordingBuffer) {
    let session = SessionConfig::new(W, H, 30, 2.0).unwrap();
    let mut buffer = RecordingBuffer::allocate(session.capacity(), W, H);
    for i in 0..session.capacity() {
        buffer.write(i, &numbered_pair(i)).unwrap();
    }
    let (colors, depths) = buffer.filled();
    let manifest = raw_writer(dir)
        .write(colors, depths, buffer.frames_written(), &session, &CameraIntrinsics::default())
        .unwrap();
    (manifest, session, buffer)
}

fn trim_writer(dir: &Path) -> ClipWriter {
    ClipWriter::new(dir, Arc::new(RawCodec), TIMESTAMP_FORMAT).with_id_prefix("c")
}

#[test]
fn trim_ten_to_twenty_keeps_source_frames() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (manifest, session, buffer) = sixty_frame_clip(src.path());

    let trimmed = trim(
        &RawCodec,
        &manifest.color_path(src.path()),
        &manifest.depth_path(src.path()),
        10,
        20,
        &session,
        &trim_writer(out.path()),
        &manifest.intrinsics(),
    )
    .unwrap();

    assert!(trimmed.time.starts_with('c'));
    assert_eq!(trimmed.frame_count(), 10);
    let depths = load_depth_npz(&trimmed.depth_path(out.path())).unwrap();
    assert_eq!(depths.dim(), (10, H as usize, W as usize));
    for k in 0..10 {
        assert!(depths.index_axis(Axis(0), k).iter().all(|&d| d == (10 + k) as u16));
    }
    let colors = read_all_colors(&trimmed.color_path(out.path()));
    assert_eq!(colors.len(), 10);
    let (source_colors, _) = buffer.read_all();
    assert_eq!(colors[0], source_colors.index_axis(Axis(0), 10));
}

#[test]
fn full_range_trim_round_trips_depth_bit_for_bit() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (manifest, session, buffer) = sixty_frame_clip(src.path());

    let trimmed = trim(
        &RawCodec,
        &manifest.color_path(src.path()),
        &manifest.depth_path(src.path()),
        0,
        60,
        &session,
        &trim_writer(out.path()),
        &manifest.intrinsics(),
    )
    .unwrap();

    let (_, source_depths) = buffer.read_all();
    assert_eq!(load_depth_npz(&trimmed.depth_path(out.path())).unwrap(), source_depths);
    assert_eq!(read_all_colors(&trimmed.color_path(out.path())).len(), 60);
    assert_eq!(trimmed.time_sec, 2.0);
}

#[test]
fn trim_past_the_end_is_rejected() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (manifest, session, _) = sixty_frame_clip(src.path());

    let err = trim(
        &RawCodec,
        &manifest.color_path(src.path()),
        &manifest.depth_path(src.path()),
        50,
        61,
        &session,
        &trim_writer(out.path()),
        &CameraIntrinsics::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::EndOfStreamDuringTrim { requested_end: 61, available: 60 }));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn short_video_fails_instead_of_zero_filling() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (manifest, session, _) = sixty_frame_clip(src.path());
    let color_path = manifest.color_path(src.path());
    RawCodec
        .write_video(&color_path, Array4::<u8>::zeros((5, H as usize, W as usize, 3)).view(), 30)
        .unwrap();

    let err = trim(
        &RawCodec,
        &color_path,
        &manifest.depth_path(src.path()),
        0,
        10,
        &session,
        &trim_writer(out.path()),
        &CameraIntrinsics::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::EndOfStreamDuringTrim { requested_end: 10, available: 5 }));
}

#[test]
fn empty_range_is_invalid() {
    let src = tempfile::tempdir().unwrap();
    let (manifest, session, _) = sixty_frame_clip(src.path());
    let err = trim(
        &RawCodec,
        &manifest.color_path(src.path()),
        &manifest.depth_path(src.path()),
        20,
        20,
        &session,
        &trim_writer(src.path()),
        &CameraIntrinsics::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidRange { start: 20, end: 20 }));
}

#[test]
fn intrinsics_are_carried_into_the_trimmed_manifest() {
    let src = tempfile::tempdir().unwrap();
    let session = SessionConfig::new(W, H, 30, 0.1).unwrap();
    let mut buffer = RecordingBuffer::allocate(session.capacity(), W, H);
    for i in 0..session.capacity() {
        buffer.push(&numbered_pair(i)).unwrap();
    }
    let intrinsics = CameraIntrinsics {
        color: Some(StreamIntrinsics {
            coeffs: vec![0.0; 5],
            fx: 600.5,
            fy: 601.25,
            height: H,
            model: "InverseBrownConrady".to_string(),
            ppx: 3.0,
            ppy: 2.0,
            width: W,
        }),
        depth: None,
    };
    let (colors, depths) = buffer.filled();
    let manifest = raw_writer(src.path())
        .write(colors, depths, buffer.frames_written(), &session, &intrinsics)
        .unwrap();

    let json_path = src.path().join(format!("{}.json", manifest.time));
    let (loaded, dir) = ClipManifest::load(&json_path).unwrap();
    assert_eq!(loaded.intrinsics(), intrinsics);

    let trimmed = trim(
        &RawCodec,
        &loaded.color_path(&dir),
        &loaded.depth_path(&dir),
        0,
        2,
        &loaded.session_config().unwrap(),
        &trim_writer(src.path()),
        &loaded.intrinsics(),
    )
    .unwrap();
    assert_eq!(trimmed.intrinsics_color, intrinsics.color);
    assert!(trimmed.intrinsics_depth.is_none());
}

#[test]
fn manifest_json_is_stable_across_reserialization() {
    let src = tempfile::tempdir().unwrap();
    let (manifest, _, _) = sixty_frame_clip(src.path());
    let json_path = src.path().join(format!("{}.json", manifest.time));
    let on_disk = std::fs::read_to_string(&json_path).unwrap();

    assert_eq!(manifest.to_json().unwrap(), manifest.to_json().unwrap());
    assert_eq!(ClipManifest::from_json(&on_disk).unwrap().to_json().unwrap(), on_disk);
}

#[test]
fn failed_write_leaves_no_partial_files() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionConfig::new(W, H, 10, 0.3).unwrap();
    let mut buffer = RecordingBuffer::allocate(session.capacity(), W, H);
    buffer.push(&numbered_pair(0)).unwrap();
    let writer = ClipWriter::new(dir.path(), Arc::new(FailingCodec), TIMESTAMP_FORMAT);

    let (colors, depths) = buffer.filled();
    let err = writer
        .write(colors, depths, buffer.frames_written(), &session, &CameraIntrinsics::default())
        .unwrap_err();
    assert!(matches!(err, AppError::PersistenceWriteFailure { .. }), "{:?}", err);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn persister_saves_partial_session_on_stop() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionConfig::new(W, H, 10, 1.0).unwrap();
    let buffer = RecordingBuffer::allocate(session.capacity(), W, H);
    let mut persister = AsyncPersister::start(
        &tokio::runtime::Handle::current(),
        buffer,
        session,
        raw_writer(dir.path()),
        CameraIntrinsics::default(),
    );
    for i in 0..4 {
        persister.push(numbered_pair(i)).unwrap();
    }
    persister.request_stop();
    persister.request_stop();

    let manifest = persister.join().await.unwrap().expect("a clip should be written");
    assert_eq!(manifest.frame_count(), 4);
    let depths = load_depth_npz(&manifest.depth_path(dir.path())).unwrap();
    assert_eq!(depths.index_axis(Axis(0), 3)[[0, 0]], 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn persister_ignores_frames_past_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionConfig::new(W, H, 10, 0.3).unwrap();
    let buffer = RecordingBuffer::allocate(session.capacity(), W, H);
    let mut persister = AsyncPersister::start(
        &tokio::runtime::Handle::current(),
        buffer,
        session,
        raw_writer(dir.path()),
        CameraIntrinsics::default(),
    );
    for i in 0..5 {
        persister.push(numbered_pair(i)).unwrap();
    }
    persister.request_stop();

    let manifest = persister.join().await.unwrap().unwrap();
    assert_eq!(manifest.frame_count(), 3);
    assert_eq!(read_all_colors(&manifest.color_path(dir.path())).len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn aborted_persister_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionConfig::new(W, H, 10, 1.0).unwrap();
    let buffer = RecordingBuffer::allocate(session.capacity(), W, H);
    let mut persister = AsyncPersister::start(
        &tokio::runtime::Handle::current(),
        buffer,
        session,
        raw_writer(dir.path()),
        CameraIntrinsics::default(),
    );
    persister.push(numbered_pair(0)).unwrap();
    persister.abort();
    persister.request_stop();

    assert!(persister.join().await.unwrap().is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
