use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::GamePhase;

/// Game phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleGamePhase {
    /// No active game.
    Idle,
    /// Scores are being collected.
    Round,
    /// Every round is scored; the game is waiting to be saved.
    Complete,
}

impl From<GamePhase> for VisibleGamePhase {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::Idle => VisibleGamePhase::Idle,
            GamePhase::Round(_) => VisibleGamePhase::Round,
            GamePhase::Complete => VisibleGamePhase::Complete,
        }
    }
}
