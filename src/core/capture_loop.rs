//! The live record loop: pulls pairs from a [`FrameSource`], shows them, and
//! feeds the active session's [`AsyncPersister`].
//!
//! Runs on a blocking thread. The only async piece is the persister, which is
//! spawned on the runtime behind the `Handle` passed in.

use crate::camera::preview::{KeyCommand, Overlay, PreviewSink};
use crate::core::capture_source::{Captured, FramePair, FrameSource};
use crate::core::recorder_state::{Command, CommandOutcome, FrameAction, RecorderState, RecorderStateMachine};
use crate::core::recording_buffer::RecordingBuffer;
use crate::errors::AppError;
use crate::persist::clip_writer::ClipWriter;
use crate::persist::manifest::ClipManifest;
use crate::persist::persister::{AsyncPersister, PersistOutcome};
use crate::session_config::SessionConfig;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;

const FPS_WINDOW: usize = 30;

/// What happened during one run of the capture loop.
#[derive(Debug, Default)]
pub struct CaptureSummary {
    pub frames_seen: usize,
    pub frames_dropped: usize,
    pub clips: Vec<ClipManifest>,
    pub discarded_sessions: usize,
    pub persist_failures: usize,
}

/// Frame rate measured over the last [`FPS_WINDOW`] frames.
struct FpsMeter {
    window_start: Instant,
    frames: usize,
    fps: f64,
}

impl FpsMeter {
    fn new() -> Self {
        FpsMeter { window_start: Instant::now(), frames: 0, fps: 0.0 }
    }

    fn tick(&mut self) -> f64 {
        self.frames += 1;
        if self.frames >= FPS_WINDOW {
            let secs = self.window_start.elapsed().as_secs_f64();
            if secs > 0.0 {
                self.fps = self.frames as f64 / secs;
            }
            self.frames = 0;
            self.window_start = Instant::now();
        }
        self.fps
    }
}

pub struct CaptureLoop<S: FrameSource, P: PreviewSink> {
    source: S,
    preview: P,
    session: SessionConfig,
    writer: Arc<ClipWriter>,
    runtime: Handle,
    machine: RecorderStateMachine,
    persister: Option<AsyncPersister>,
    max_consecutive_drops: usize,
    fps: FpsMeter,
    summary: CaptureSummary,
}

impl<S: FrameSource, P: PreviewSink> CaptureLoop<S, P> {
    pub fn new(
        source: S,
        preview: P,
        session: SessionConfig,
        writer: Arc<ClipWriter>,
        runtime: Handle,
        max_consecutive_drops: usize,
    ) -> Self {
        let machine = RecorderStateMachine::new(session.capacity(), session.countdown_frames());
        CaptureLoop {
            source,
            preview,
            session,
            writer,
            runtime,
            machine,
            persister: None,
            max_consecutive_drops: max_consecutive_drops.max(1),
            fps: FpsMeter::new(),
            summary: CaptureSummary::default(),
        }
    }

    /// Runs until the user quits or the source fails. Any in-flight session is
    /// flushed (or discarded, if it was aborted) before this returns.
    pub fn run(mut self) -> Result<CaptureSummary, AppError> {
        let loop_start = Instant::now();
        info!(
            "🎥 Previewing '{}' at {}x{}@{}Hz; press 'r' to record {:.2}s ({} frames), 'c' to cancel, Esc to quit.",
            self.source.get_name(),
            self.session.width,
            self.session.height,
            self.session.frequency,
            self.session.duration_secs,
            self.session.capacity()
        );

        let result = self.run_frames();
        self.shutdown();
        let summary = std::mem::take(&mut self.summary);
        info!(
            "🏁 Capture loop finished in {:?}: {} frame(s) seen, {} dropped, {} clip(s) saved.",
            loop_start.elapsed(),
            summary.frames_seen,
            summary.frames_dropped,
            summary.clips.len()
        );
        result.map(|_| summary)
    }

    fn run_frames(&mut self) -> Result<(), AppError> {
        let mut consecutive_drops = 0usize;
        loop {
            self.reap_persister();

            let pair = match self.source.next_pair()? {
                Captured::Frame(pair) => pair,
                Captured::Dropped => {
                    consecutive_drops += 1;
                    self.summary.frames_dropped += 1;
                    warn!("⚠️ Dropped an incomplete frame pair ({} in a row).", consecutive_drops);
                    if consecutive_drops >= self.max_consecutive_drops {
                        return Err(AppError::Device(format!(
                            "'{}' delivered {} incomplete frame pairs in a row",
                            self.source.get_name(),
                            consecutive_drops
                        )));
                    }
                    continue;
                }
            };
            if let Err(e) = pair.check_shape(self.session.width, self.session.height) {
                self.summary.frames_dropped += 1;
                warn!("🚫 Skipping frame pair with wrong geometry: {}", e);
                continue;
            }
            consecutive_drops = 0;
            self.summary.frames_seen += 1;

            let action = self.machine.on_frame();
            if action == FrameAction::BeginSession {
                self.begin_session();
            }

            let overlay = self.overlay();
            let key = self.preview.show(&pair, &overlay)?;

            if let FrameAction::Record { index, last } = action {
                self.record(pair, index, last);
            }

            if let Some(key) = key {
                if self.handle_key(key) {
                    return Ok(());
                }
            }
        }
    }

    fn overlay(&mut self) -> Overlay {
        let state = self.machine.state();
        let elapsed_secs = match state {
            RecorderState::Counting { remaining_frames } => -(self.session.seconds_for(remaining_frames as usize)),
            RecorderState::Recording { frames_written } => self.session.seconds_for(frames_written),
            _ => 0.0,
        };
        Overlay {
            width: self.session.width,
            height: self.session.height,
            actual_fps: self.fps.tick(),
            frequency: self.session.frequency,
            elapsed_secs,
            duration_secs: self.session.duration_secs,
            state_label: state.label(),
        }
    }

    fn record(&mut self, pair: FramePair, index: usize, last: bool) {
        let Some(persister) = self.persister.as_mut() else {
            error!("❌ Frame {} arrived for a session without a persister.", index);
            return;
        };
        if let Err(e) = persister.push(pair) {
            error!("❌ Could not queue frame {}: {}", index, e);
        }
        if last {
            persister.request_stop();
        }
    }

    /// Returns true when the loop should exit.
    fn handle_key(&mut self, key: KeyCommand) -> bool {
        let command = match key {
            KeyCommand::Record => Command::Start,
            KeyCommand::Abort => Command::Abort,
            KeyCommand::Quit => Command::Quit,
            KeyCommand::StepBack | KeyCommand::StepForward => return false,
        };
        let frames_before = self.machine.frames_written();
        match self.machine.on_command(command) {
            CommandOutcome::Ignored => false,
            CommandOutcome::CountdownStarted => {
                info!("⏱️ Recording starts in {:.1}s...", self.session.countdown_secs);
                false
            }
            CommandOutcome::CountdownCancelled => {
                info!("⏹️ Countdown cancelled.");
                false
            }
            CommandOutcome::BeginSession => {
                self.begin_session();
                false
            }
            CommandOutcome::Discard => {
                if let Some(persister) = self.persister.as_mut() {
                    persister.abort();
                }
                info!("🗑️ Recording cancelled.");
                false
            }
            CommandOutcome::Exit { flush } => {
                if flush {
                    info!("💾 Quit while recording; saving {} frame(s) captured so far.", frames_before);
                }
                true
            }
        }
    }

    fn begin_session(&mut self) {
        let buffer = RecordingBuffer::allocate(self.session.capacity(), self.session.width, self.session.height);
        let intrinsics = if self.session.capture_intrinsics {
            self.source.intrinsics()
        } else {
            Default::default()
        };
        self.persister = Some(AsyncPersister::start(
            &self.runtime,
            buffer,
            self.session.clone(),
            Arc::clone(&self.writer),
            intrinsics,
        ));
    }

    fn reap_persister(&mut self) {
        if self.persister.as_ref().is_some_and(AsyncPersister::is_finished) {
            if let Some(persister) = self.persister.take() {
                let outcome = persister.wait();
                self.record_outcome(outcome);
                if self.machine.is_recording() {
                    self.machine.on_persister_lost();
                } else {
                    self.machine.on_persister_finished();
                }
            }
        }
    }

    fn record_outcome(&mut self, outcome: PersistOutcome) {
        match outcome {
            Ok(Some(manifest)) => {
                info!("✅ Saved clip '{}' ({:.2}s).", manifest.time, manifest.time_sec);
                self.summary.clips.push(manifest);
            }
            Ok(None) => {
                debug!("Session ended without a clip.");
                self.summary.discarded_sessions += 1;
            }
            Err(e) => {
                error!("❌ Saving clip failed: {}", e);
                self.summary.persist_failures += 1;
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut persister) = self.persister.take() {
            // No-op when the session was already stopped or aborted.
            persister.request_stop();
            info!("⏳ Waiting for the last clip to finish saving...");
            let outcome = persister.wait();
            self.record_outcome(outcome);
            self.machine.on_persister_finished();
        }
        self.source.stop();
        self.preview.close();
    }
}
