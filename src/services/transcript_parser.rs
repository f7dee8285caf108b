//! Boundary to the completion API: prompt building and decoding of the replies.
//!
//! Replies are untrusted. They are decoded through typed schemas and filtered
//! entry by entry; a reply that is not a JSON object at all is reported as
//! [`ParserError::Malformed`].

use std::sync::Arc;

use rand::seq::IndexedRandom;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    config::ModelSettings,
    dao::models::PlayerFact,
    services::{
        completion::{CompletionClient, CompletionError, CompletionRequest},
        prompts,
    },
    state::{
        adapter::{ParseResult, ScoreEntry},
        grid::{MAX_PLAYERS, MAX_SCORE, MIN_PLAYERS, MIN_SCORE, Round},
    },
};

/// Failures of a parse request.
#[derive(Debug, Error)]
pub enum ParserError {
    /// The completion API call failed.
    #[error(transparent)]
    Completion(#[from] CompletionError),
    /// The reply could not be decoded into the expected shape.
    #[error("unusable completion reply: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct ScoreReply {
    #[serde(default)]
    round: Value,
    #[serde(default)]
    scores: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreItem {
    player_index: i64,
    score: i64,
}

#[derive(Debug, Deserialize)]
struct SetupReply {
    players: Vec<Value>,
}

/// Turns transcripts into structured results with the selected models.
pub struct TranscriptParser {
    client: Arc<dyn CompletionClient>,
    settings: RwLock<ModelSettings>,
}

impl TranscriptParser {
    /// Parser sending its requests through `client`.
    pub fn new(client: Arc<dyn CompletionClient>, settings: ModelSettings) -> Self {
        Self {
            client,
            settings: RwLock::new(settings),
        }
    }

    /// Models and welcome style in effect.
    pub async fn settings(&self) -> ModelSettings {
        self.settings.read().await.clone()
    }

    /// Use `settings` for every later request.
    pub async fn set_settings(&self, settings: ModelSettings) {
        info!(
            score = %settings.models.score_parsing,
            setup = %settings.models.setup_parsing,
            welcome = %settings.models.welcome_message,
            "model selection changed"
        );
        *self.settings.write().await = settings;
    }

    /// Extract the round and per-player scores announced in `transcript`.
    pub async fn parse_scores(
        &self,
        transcript: &str,
        roster: &[String],
    ) -> Result<ParseResult, ParserError> {
        let model = self.settings.read().await.models.score_parsing.clone();
        let reply = self
            .client
            .complete(CompletionRequest {
                model,
                system_prompt: prompts::score_prompt(roster),
                user_prompt: transcript.to_string(),
                json_reply: true,
            })
            .await?;
        decode_scores(&reply, roster.len())
    }

    /// Extract the roster announced in `transcript`.
    pub async fn parse_setup(&self, transcript: &str) -> Result<Vec<String>, ParserError> {
        let model = self.settings.read().await.models.setup_parsing.clone();
        let reply = self
            .client
            .complete(CompletionRequest {
                model,
                system_prompt: prompts::SETUP_PROMPT.to_string(),
                user_prompt: transcript.to_string(),
                json_reply: true,
            })
            .await?;
        decode_setup(&reply)
    }

    /// Announcer welcome for `players`, falling back to a fixed text when the
    /// completion API is unavailable.
    pub async fn welcome_message(&self, players: &[String], facts: &[PlayerFact]) -> String {
        let player_info = player_info(players, facts);
        let settings = self.settings().await;
        let welcome = settings.welcome_settings;
        let request = CompletionRequest {
            model: settings.models.welcome_message,
            system_prompt: prompts::welcome_prompt(
                welcome.length.as_str(),
                welcome.tone.as_str(),
                &player_info,
            ),
            user_prompt: format!(
                "Generate a welcome message for {} players: {player_info}",
                players.len()
            ),
            json_reply: false,
        };
        match self.client.complete(request).await {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "welcome message generation failed; using fallback");
                fallback_welcome(players)
            }
        }
    }
}

fn decode_scores(reply: &str, players: usize) -> Result<ParseResult, ParserError> {
    let raw: ScoreReply =
        serde_json::from_str(reply).map_err(|err| ParserError::Malformed(err.to_string()))?;

    let round = raw
        .round
        .as_i64()
        .and_then(|n| u8::try_from(n).ok())
        .and_then(Round::new);

    let total = raw.scores.len();
    let scores = raw
        .scores
        .into_iter()
        .filter_map(|item| serde_json::from_value::<ScoreItem>(item).ok())
        .filter(|item| (0..players as i64).contains(&item.player_index))
        .filter(|item| (i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)).contains(&item.score))
        .map(|item| ScoreEntry {
            player_index: item.player_index,
            score: item.score,
        })
        .collect::<Vec<_>>();
    if scores.len() < total {
        debug!(
            dropped = total - scores.len(),
            "filtered invalid score entries from completion reply"
        );
    }

    Ok(ParseResult { round, scores })
}

fn decode_setup(reply: &str) -> Result<Vec<String>, ParserError> {
    let raw: SetupReply =
        serde_json::from_str(reply).map_err(|err| ParserError::Malformed(err.to_string()))?;
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&raw.players.len()) {
        return Err(ParserError::Malformed(format!(
            "expected 2 to 6 players, got {}",
            raw.players.len()
        )));
    }
    raw.players
        .into_iter()
        .map(|name| match name {
            Value::String(name) if !name.trim().is_empty() => Ok(name.trim().to_string()),
            other => Err(ParserError::Malformed(format!(
                "invalid player name {other}"
            ))),
        })
        .collect()
}

/// Roster line, optionally followed by a note about one random player with a fact.
fn player_info(players: &[String], facts: &[PlayerFact]) -> String {
    let roster = players.join(", ");
    let candidates = players
        .iter()
        .filter_map(|player| {
            facts
                .iter()
                .find(|fact| fact.player_name.eq_ignore_ascii_case(player))
                .map(|fact| (player, fact))
        })
        .collect::<Vec<_>>();
    match candidates.choose(&mut rand::rng()) {
        Some((player, fact)) => format!("{roster} (Note about {player}: {})", fact.fact),
        None => roster,
    }
}

/// Fixed welcome used when no message can be generated.
pub fn fallback_welcome(players: &[String]) -> String {
    let list = match players {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    };
    format!(
        "Welcome to Play Nine, where {} golfers step up to the challenge! {list}, prepare to tee off on this exciting card game adventure. May your scores be low and your spirits high!",
        players.len()
    )
}
