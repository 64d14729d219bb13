//! Capture-mode state machine.
//!
//! Pure bookkeeping: it never touches frames, devices or disks. The capture
//! loop feeds it frame arrivals and user commands and acts on what it returns.

use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Counting { remaining_frames: u32 },
    Recording { frames_written: usize },
    /// Waiting for the persister to finish writing the last session.
    Saving,
}

impl RecorderState {
    pub fn label(&self) -> &'static str {
        match self {
            RecorderState::Idle => "WAIT",
            RecorderState::Counting { .. } => "READY",
            RecorderState::Recording { .. } => "REC",
            RecorderState::Saving => "SAVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Abort,
    Quit,
}

/// What to do with the frame that just arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    PreviewOnly,
    /// The countdown ran out on this frame; a fresh session must be started.
    BeginSession,
    /// Buffer this frame at `index`. `last` means the session is now complete.
    Record { index: usize, last: bool },
}

/// What the capture loop must do in response to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Ignored,
    CountdownStarted,
    /// The countdown was aborted before any frame was recorded.
    CountdownCancelled,
    BeginSession,
    /// Drop the in-flight session without writing it.
    Discard,
    /// Leave the loop. `flush` asks for the partial session to be saved first.
    Exit { flush: bool },
}

#[derive(Debug)]
pub struct RecorderStateMachine {
    state: RecorderState,
    capacity: usize,
    countdown_frames: u32,
    persister_busy: bool,
}

impl RecorderStateMachine {
    pub fn new(capacity: usize, countdown_frames: u32) -> Self {
        RecorderStateMachine {
            state: RecorderState::Idle,
            capacity,
            countdown_frames,
            persister_busy: false,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn frames_written(&self) -> usize {
        match self.state {
            RecorderState::Recording { frames_written } => frames_written,
            _ => 0,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording { .. })
    }

    /// True while a previous session is still being written or discarded.
    pub fn persister_busy(&self) -> bool {
        self.persister_busy
    }

    pub fn on_command(&mut self, command: Command) -> CommandOutcome {
        let outcome = match (command, self.state) {
            (Command::Start, RecorderState::Idle) if self.persister_busy => {
                warn!("⏳ Previous clip is still being saved; start request ignored.");
                CommandOutcome::Ignored
            }
            (Command::Start, RecorderState::Idle) => {
                if self.countdown_frames > 0 {
                    self.state = RecorderState::Counting { remaining_frames: self.countdown_frames };
                    CommandOutcome::CountdownStarted
                } else {
                    self.begin_recording();
                    CommandOutcome::BeginSession
                }
            }
            (Command::Start, state) => {
                debug!("Start request ignored in state {:?}", state);
                CommandOutcome::Ignored
            }
            (Command::Abort, RecorderState::Counting { .. }) => {
                self.state = RecorderState::Idle;
                CommandOutcome::CountdownCancelled
            }
            (Command::Abort, RecorderState::Recording { .. }) => {
                self.state = RecorderState::Idle;
                self.persister_busy = true;
                CommandOutcome::Discard
            }
            (Command::Abort, _) => CommandOutcome::Ignored,
            (Command::Quit, RecorderState::Recording { .. }) => {
                self.state = RecorderState::Saving;
                self.persister_busy = true;
                CommandOutcome::Exit { flush: true }
            }
            (Command::Quit, _) => CommandOutcome::Exit { flush: false },
        };
        debug!("Command {:?} -> {:?} (state now {:?})", command, outcome, self.state);
        outcome
    }

    pub fn on_frame(&mut self) -> FrameAction {
        match self.state {
            RecorderState::Idle | RecorderState::Saving => FrameAction::PreviewOnly,
            RecorderState::Counting { remaining_frames } => {
                if remaining_frames <= 1 {
                    self.begin_recording();
                    FrameAction::BeginSession
                } else {
                    self.state = RecorderState::Counting { remaining_frames: remaining_frames - 1 };
                    FrameAction::PreviewOnly
                }
            }
            RecorderState::Recording { frames_written } => {
                let index = frames_written;
                let last = index + 1 >= self.capacity;
                if last {
                    info!("🏁 Session reached {} frames, handing off to the persister.", self.capacity);
                    self.state = RecorderState::Saving;
                    self.persister_busy = true;
                } else {
                    self.state = RecorderState::Recording { frames_written: index + 1 };
                }
                FrameAction::Record { index, last }
            }
        }
    }

    /// The persister for the last session has finished (written, failed or discarded).
    pub fn on_persister_finished(&mut self) {
        self.persister_busy = false;
        if self.state == RecorderState::Saving {
            self.state = RecorderState::Idle;
        }
    }

    /// The persister ended while the session was still being recorded, so no
    /// later frame can reach it. Drops the session back to `Idle`.
    pub fn on_persister_lost(&mut self) {
        if let RecorderState::Recording { frames_written } = self.state {
            warn!(
                "⚠️ Persister ended with the session still recording; dropping it after {} frame(s).",
                frames_written
            );
        }
        self.persister_busy = false;
        if matches!(self.state, RecorderState::Recording { .. } | RecorderState::Saving) {
            self.state = RecorderState::Idle;
        }
    }

    fn begin_recording(&mut self) {
        info!("🔴 Start recording ({} frames).", self.capacity);
        self.state = RecorderState::Recording { frames_written: 0 };
    }
}
