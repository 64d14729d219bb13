//! Background save path for one recording session.
//!
//! The capture loop hands a freshly allocated [`RecordingBuffer`] to
//! [`AsyncPersister::start`] and afterwards only talks to the worker through
//! an unbounded queue. The worker owns the buffer until the clip is written.

use crate::core::capture_source::{CameraIntrinsics, FramePair};
use crate::core::recording_buffer::RecordingBuffer;
use crate::errors::AppError;
use crate::persist::clip_writer::ClipWriter;
use crate::persist::manifest::ClipManifest;
use crate::session_config::SessionConfig;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

#[derive(Debug)]
enum PersistMessage {
    Frame(FramePair),
    Stop,
    Abort,
}

/// `Ok(None)` means the session was discarded or held no frames.
pub type PersistOutcome = Result<Option<ClipManifest>, AppError>;

pub struct AsyncPersister {
    sender: UnboundedSender<PersistMessage>,
    handle: JoinHandle<PersistOutcome>,
    closing: bool,
}

impl AsyncPersister {
    pub fn start(
        runtime: &Handle,
        buffer: RecordingBuffer,
        session: SessionConfig,
        writer: Arc<ClipWriter>,
        intrinsics: CameraIntrinsics,
    ) -> Self {
        let (sender, receiver) = unbounded_channel();
        debug!("🧵 Spawning persister for a {}-frame session.", buffer.capacity());
        let handle = runtime.spawn_blocking(move || drain_queue(receiver, buffer, session, writer, intrinsics));
        AsyncPersister { sender, handle, closing: false }
    }

    /// Queues a frame without blocking.
    pub fn push(&self, pair: FramePair) -> Result<(), AppError> {
        self.sender
            .send(PersistMessage::Frame(pair))
            .map_err(|_| AppError::Task("Persister is no longer accepting frames".to_string()))
    }

    /// Asks the worker to write what it has and finish. Idempotent.
    pub fn request_stop(&mut self) {
        self.close_with(PersistMessage::Stop);
    }

    /// Asks the worker to drop the session without writing. Idempotent.
    pub fn abort(&mut self) {
        self.close_with(PersistMessage::Abort);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks the calling (non-async) thread until the worker is done.
    pub fn wait(self) -> PersistOutcome {
        let handle = self.handle;
        drop(self.sender);
        flatten_join(futures::executor::block_on(handle))
    }

    pub async fn join(self) -> PersistOutcome {
        let handle = self.handle;
        drop(self.sender);
        flatten_join(handle.await)
    }

    fn close_with(&mut self, message: PersistMessage) {
        if self.closing {
            debug!("Persister already closing; ignoring {:?}.", message);
            return;
        }
        self.closing = true;
        if self.sender.send(message).is_err() {
            warn!("⚠️ Persister exited before it could be told to finish.");
        }
    }
}

fn flatten_join(joined: Result<PersistOutcome, tokio::task::JoinError>) -> PersistOutcome {
    joined.map_err(|e| AppError::Task(format!("Persister task panicked or was cancelled: {}", e)))?
}

fn drain_queue(
    mut receiver: UnboundedReceiver<PersistMessage>,
    mut buffer: RecordingBuffer,
    session: SessionConfig,
    writer: Arc<ClipWriter>,
    intrinsics: CameraIntrinsics,
) -> PersistOutcome {
    let task_start = Instant::now();
    let mut overflowed = 0usize;

    while let Some(message) = receiver.blocking_recv() {
        match message {
            PersistMessage::Frame(pair) => {
                if let Err(e) = buffer.push(&pair) {
                    overflowed += 1;
                    warn!("🚫 Persister dropped a frame: {}", e);
                }
            }
            PersistMessage::Stop => {
                debug!("Persister received stop after {:?}.", task_start.elapsed());
                return flush(&buffer, &session, &writer, &intrinsics, overflowed);
            }
            PersistMessage::Abort => {
                info!("🗑️ Recording aborted; discarding {} buffered frame(s).", buffer.frames_written());
                return Ok(None);
            }
        }
    }

    warn!("⚠️ Persister queue closed without a stop request; saving what was buffered.");
    flush(&buffer, &session, &writer, &intrinsics, overflowed)
}

fn flush(
    buffer: &RecordingBuffer,
    session: &SessionConfig,
    writer: &ClipWriter,
    intrinsics: &CameraIntrinsics,
    overflowed: usize,
) -> PersistOutcome {
    let frames_written = buffer.frames_written();
    if overflowed > 0 {
        warn!("⚠️ {} frame(s) arrived after the buffer was full and were not saved.", overflowed);
    }
    if frames_written == 0 {
        warn!("📭 No frames were buffered; nothing to save.");
        return Ok(None);
    }
    if frames_written < buffer.capacity() {
        info!("✂️ Saving partial session: {} of {} frame(s).", frames_written, buffer.capacity());
    }
    let (colors, depths) = buffer.filled();
    match writer.write(colors, depths, frames_written, session, intrinsics) {
        Ok(manifest) => Ok(Some(manifest)),
        Err(e) => {
            error!("❌ Persister failed to write clip: {}", e);
            Err(e)
        }
    }
}
