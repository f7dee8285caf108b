//! DTO definitions used by the session REST API and the SSE stream.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::GameRecord,
    dto::{
        phase::VisibleGamePhase,
        validation::{validate_not_blank, validate_player_names},
    },
    services::reconciler::Connectivity,
    state::{
        adapter::{AdapterOutcome, AppliedScore, ParseResult, ScoreEntry},
        capture::CapturePhase,
        game::GameSession,
        grid::{Round, Standing},
        state_machine::GamePhase,
    },
};

/// Roster for a new game.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartGameRequest {
    /// Names in seating order.
    #[validate(
        length(min = 2, max = 6, message = "a game needs 2 to 6 players"),
        custom(function = "validate_player_names")
    )]
    pub players: Vec<String>,
}

/// Free-form speech transcript.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TranscriptRequest {
    /// What the speaker said.
    #[validate(custom(function = "validate_not_blank"))]
    pub transcript: String,
}

/// Score typed into one cell of the grid.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScoreRequest {
    /// Score value.
    #[validate(range(min = -999, max = 999))]
    pub score: i32,
}

/// One parsed `(player, score)` pair. Invalid pairs are dropped, not rejected.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntryInput {
    /// Seat in the roster; out-of-range values are dropped.
    pub player_index: i64,
    /// Score as parsed.
    pub score: i64,
}

/// A parse result produced elsewhere, applied as if it came from a transcript.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ParsedScoresRequest {
    /// Round the scores belong to; the current round when absent.
    #[validate(range(min = 1, max = 9))]
    #[serde(default)]
    pub round: Option<u8>,
    /// Parsed pairs, in announcement order.
    #[serde(default)]
    pub scores: Vec<ScoreEntryInput>,
}

impl From<ParsedScoresRequest> for ParseResult {
    fn from(value: ParsedScoresRequest) -> Self {
        Self {
            round: value.round.and_then(Round::new),
            scores: value
                .scores
                .into_iter()
                .map(|entry| ScoreEntry {
                    player_index: entry.player_index,
                    score: entry.score,
                })
                .collect(),
        }
    }
}

/// Transcript produced by an open listening session.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UtteranceRequest {
    /// Identifier returned by `/session/capture/start`.
    pub capture_id: Uuid,
    /// What the speaker said.
    #[validate(custom(function = "validate_not_blank"))]
    pub transcript: String,
}

/// Voice capture state.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaptureView {
    /// Whether a listening session is open.
    pub listening: bool,
    /// Identifier of the open listening session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_id: Option<Uuid>,
}

impl From<CapturePhase> for CaptureView {
    fn from(value: CapturePhase) -> Self {
        match value {
            CapturePhase::Idle => Self {
                listening: false,
                capture_id: None,
            },
            CapturePhase::Listening { id, .. } => Self {
                listening: true,
                capture_id: Some(id),
            },
        }
    }
}

/// One leaderboard line.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct StandingView {
    /// Player name.
    pub name: String,
    /// Total over every round.
    pub total: i32,
}

impl From<Standing> for StandingView {
    fn from(value: Standing) -> Self {
        Self {
            name: value.name,
            total: value.total,
        }
    }
}

/// Everything a client needs to render the running game.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Visible phase.
    pub phase: VisibleGamePhase,
    /// Round being scored; absent when idle or complete.
    pub current_round: Option<u8>,
    /// Names in seating order.
    pub players: Vec<String>,
    /// Nine rows, one column per player; `null` marks an unset cell.
    pub scores: Vec<Vec<Option<i32>>>,
    /// Running totals through each round, one row per round.
    pub subtotals: Vec<Vec<i32>>,
    /// Final totals so far, in seating order.
    pub totals: Vec<i32>,
    /// Lowest total first; ties keep seating order.
    pub leaderboard: Vec<StandingView>,
    /// Whether the game store is reachable.
    pub connectivity: Connectivity,
    /// Voice capture state.
    pub capture: CaptureView,
    /// Absent when idle.
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub started_at: Option<OffsetDateTime>,
}

impl SessionView {
    /// Render `game` in `phase`.
    pub fn new(
        phase: GamePhase,
        game: Option<&GameSession>,
        connectivity: Connectivity,
        capture: CapturePhase,
    ) -> Self {
        let mut view = Self {
            phase: phase.into(),
            current_round: phase.current_round().map(Round::number),
            players: Vec::new(),
            scores: Vec::new(),
            subtotals: Vec::new(),
            totals: Vec::new(),
            leaderboard: Vec::new(),
            connectivity,
            capture: capture.into(),
            started_at: None,
        };
        if let Some(game) = game {
            let grid = &game.grid;
            view.players = grid.roster().names().to_vec();
            view.scores = grid.rows();
            view.subtotals = Round::all().map(|round| grid.subtotals(round)).collect();
            view.totals = grid.totals();
            view.leaderboard = grid.leaderboard().into_iter().map(Into::into).collect();
            view.started_at = Some(game.started_at);
        }
        view
    }
}

/// Whether a batch of scores produced anything.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    /// At least one score was written.
    Applied,
    /// Nothing usable in the batch.
    NoScoresDetected,
}

/// Score written to the grid.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedScoreView {
    /// Seat in the roster.
    pub player_index: usize,
    /// Score value.
    pub score: i32,
}

impl From<AppliedScore> for AppliedScoreView {
    fn from(value: AppliedScore) -> Self {
        Self {
            player_index: value.player_index,
            score: value.score,
        }
    }
}

/// Result of the save attempted when the last round completes.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// The game was recorded and the session is idle again.
    Saved {
        /// Record as stored.
        game: GameRecord,
    },
    /// The game stays complete until `/session/finish` succeeds.
    Failed {
        /// Why the save failed.
        error: String,
    },
}

/// Response to every score mutation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdateResponse {
    /// Whether anything was written.
    pub detection: Detection,
    /// Round the scores were written to.
    pub round: Option<u8>,
    /// Scores written, in the order received.
    pub applied: Vec<AppliedScoreView>,
    /// Entries dropped by validation.
    pub dropped: usize,
    /// Parsed scores: every player received one from this batch. Direct
    /// edits: the written round is now fully scored.
    pub covers_roster: bool,
    /// Session after the update.
    pub session: SessionView,
    /// Present when the update completed the game.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<SaveOutcome>,
}

impl ScoreUpdateResponse {
    /// Response for an adapter outcome.
    pub fn new(outcome: AdapterOutcome, session: SessionView, save: Option<SaveOutcome>) -> Self {
        match outcome {
            AdapterOutcome::NoScoresDetected { dropped } => Self {
                detection: Detection::NoScoresDetected,
                round: None,
                applied: Vec::new(),
                dropped,
                covers_roster: false,
                session,
                save,
            },
            AdapterOutcome::Applied {
                round,
                applied,
                dropped,
                covers_roster,
            } => Self {
                detection: Detection::Applied,
                round: Some(round.number()),
                applied: applied.into_iter().map(Into::into).collect(),
                dropped,
                covers_roster,
                session,
                save,
            },
        }
    }
}

/// What a finished listening session was used for.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UtteranceResponse {
    /// The transcript named the players of a new game.
    Setup {
        /// The new game.
        session: SessionView,
    },
    /// The transcript announced scores.
    Scores {
        /// Outcome of the batch.
        result: ScoreUpdateResponse,
    },
}

/// Announcer text for the current roster.
#[derive(Debug, Serialize, ToSchema)]
pub struct WelcomeResponse {
    /// Welcome text.
    pub message: String,
}
