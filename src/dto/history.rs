//! DTO definitions for the game history views.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::dao::models::GameRecord;

/// Lowest total of a finished game and who scored it.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct Winner {
    /// Player name.
    pub name: String,
    /// Final total.
    pub score: i32,
}

/// One line of the history listing.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    /// Record identifier.
    pub id: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Roster size.
    pub player_count: usize,
    /// Final totals in seating order.
    pub scores: Vec<i32>,
    /// Absent for a record without totals.
    pub winner: Option<Winner>,
}

impl From<&GameRecord> for GameSummary {
    fn from(game: &GameRecord) -> Self {
        Self {
            id: game.id.clone(),
            date: game.date.clone(),
            player_count: game.player_names.len(),
            scores: game.final_totals.clone(),
            winner: winner(game),
        }
    }
}

/// First player holding the lowest total.
pub fn winner(game: &GameRecord) -> Option<Winner> {
    let (index, score) = game
        .final_totals
        .iter()
        .enumerate()
        .min_by_key(|(_, total)| **total)?;
    let name = game.player_names.get(index)?;
    Some(Winner {
        name: name.clone(),
        score: *score,
    })
}

/// Query string of the history search.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Comma separated name fragments; every fragment must match a player.
    #[serde(default)]
    pub players: Option<String>,
}

impl SearchQuery {
    /// Trimmed, non-empty fragments.
    pub fn fragments(&self) -> Vec<String> {
        self.players
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty())
            .map(str::to_string)
            .collect()
    }
}
