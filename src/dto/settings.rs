//! DTOs for the runtime model selection and one-off model tests.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::{ModelSelection, ModelSettings, WelcomeSettings},
    dto::validation::{validate_not_blank, validate_player_names},
    state::adapter::ParseResult,
};

/// Models to use from now on.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettingsRequest {
    /// Model reading scores out of transcripts.
    #[validate(length(max = 200), custom(function = "validate_not_blank"))]
    pub score_parsing: String,
    /// Model reading the roster out of a setup transcript.
    #[validate(length(max = 200), custom(function = "validate_not_blank"))]
    pub setup_parsing: String,
    /// Model writing the announcer welcome.
    #[validate(length(max = 200), custom(function = "validate_not_blank"))]
    pub welcome_message: String,
    /// Length and tone of welcome messages; defaults when absent.
    #[serde(default)]
    pub welcome_settings: WelcomeSettings,
}

impl From<ModelSettingsRequest> for ModelSettings {
    fn from(value: ModelSettingsRequest) -> Self {
        Self {
            models: ModelSelection {
                score_parsing: value.score_parsing.trim().to_string(),
                setup_parsing: value.setup_parsing.trim().to_string(),
                welcome_message: value.welcome_message.trim().to_string(),
            },
            welcome_settings: value.welcome_settings,
        }
    }
}

/// Request kind exercised by a model test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModelTask {
    /// Announcer welcome for `players`.
    Welcome,
    /// Roster parsed from `transcript`.
    Setup,
    /// Scores parsed from `transcript` against `players`.
    Score,
}

/// One call to the selected model, without touching the running game.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ModelTestRequest {
    /// Request kind to try.
    pub task: ModelTask,
    /// Required by `setup` and `score`.
    #[serde(default)]
    pub transcript: Option<String>,
    /// Required by `welcome` and `score`.
    #[serde(default)]
    #[validate(length(max = 6), custom(function = "validate_player_names"))]
    pub players: Vec<String>,
}

/// Score entry as decoded from the model reply.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedScoreView {
    /// Seat in the roster, as parsed.
    pub player_index: i64,
    /// Score as parsed.
    pub score: i64,
}

/// What the model produced.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum ModelTestResponse {
    /// Generated welcome, or the fixed fallback.
    Welcome {
        /// Announcer text.
        message: String,
    },
    /// Parsed roster.
    Setup {
        /// Names in the order they were announced.
        players: Vec<String>,
    },
    /// Parsed round and scores; empty when nothing usable was found.
    Score {
        /// Round named in the transcript.
        round: Option<u8>,
        /// Pairs as parsed, before any roster check.
        scores: Vec<ParsedScoreView>,
    },
}

impl From<ParseResult> for ModelTestResponse {
    fn from(value: ParseResult) -> Self {
        ModelTestResponse::Score {
            round: value.round.map(|round| round.number()),
            scores: value
                .scores
                .into_iter()
                .map(|entry| ParsedScoreView {
                    player_index: entry.player_index,
                    score: entry.score,
                })
                .collect(),
        }
    }
}
