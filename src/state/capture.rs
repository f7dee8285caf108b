//! Two-state voice capture machine. Only one listening session may be open at
//! a time; finishing it hands back the utterance for processing.

use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Identifier of a listening session.
pub type CaptureId = Uuid;

/// Whether the microphone is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    /// Not listening.
    Idle,
    /// A listening session is open.
    Listening {
        /// Session identifier the client must echo back.
        id: CaptureId,
        /// When the session opened.
        since: Instant,
    },
}

/// Transcript produced by a finished listening session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Session the transcript belongs to.
    pub capture_id: CaptureId,
    /// Raw speech-to-text output.
    pub transcript: String,
}

/// Rejected capture transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// `start` while another session is open.
    #[error("a listening session is already open")]
    AlreadyListening,
    /// `finish` or `cancel` while idle.
    #[error("no listening session is open")]
    NotListening,
    /// `finish` for a session that is not the open one.
    #[error("listening session `{got}` is not the open session `{expected}`")]
    IdMismatch {
        /// Open session.
        expected: CaptureId,
        /// Session named by the caller.
        got: CaptureId,
    },
}

/// Idle/Listening machine serialising voice capture.
#[derive(Debug, Clone)]
pub struct CaptureMachine {
    phase: CapturePhase,
}

impl Default for CaptureMachine {
    fn default() -> Self {
        Self {
            phase: CapturePhase::Idle,
        }
    }
}

impl CaptureMachine {
    /// Machine starting idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// Open a listening session.
    pub fn start(&mut self) -> Result<CaptureId, CaptureError> {
        if matches!(self.phase, CapturePhase::Listening { .. }) {
            return Err(CaptureError::AlreadyListening);
        }
        let id = Uuid::new_v4();
        self.phase = CapturePhase::Listening {
            id,
            since: Instant::now(),
        };
        Ok(id)
    }

    /// Close the open session with the transcript it produced.
    pub fn finish(
        &mut self,
        capture_id: CaptureId,
        transcript: String,
    ) -> Result<Utterance, CaptureError> {
        match self.phase {
            CapturePhase::Idle => Err(CaptureError::NotListening),
            CapturePhase::Listening { id, .. } if id != capture_id => {
                Err(CaptureError::IdMismatch {
                    expected: id,
                    got: capture_id,
                })
            }
            CapturePhase::Listening { .. } => {
                self.phase = CapturePhase::Idle;
                Ok(Utterance {
                    capture_id,
                    transcript,
                })
            }
        }
    }

    /// Drop the open session without producing an utterance.
    pub fn cancel(&mut self) -> Result<CaptureId, CaptureError> {
        match self.phase {
            CapturePhase::Idle => Err(CaptureError::NotListening),
            CapturePhase::Listening { id, .. } => {
                self.phase = CapturePhase::Idle;
                Ok(id)
            }
        }
    }
}
