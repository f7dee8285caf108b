//! Applies parsed voice transcripts to the score grid.
//!
//! The parser boundary already filters its output, but every entry is checked
//! again here: anything outside the roster or the score range is dropped on
//! its own without rejecting the rest of the batch.

use std::collections::BTreeSet;

use crate::state::grid::{MAX_SCORE, MIN_SCORE, Round, ScoreGrid};

/// One `(player, score)` pair as produced by the transcript parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEntry {
    /// Index into the roster.
    pub player_index: i64,
    /// Score announced for that player.
    pub score: i64,
}

/// Structured result of parsing one transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    /// Round named in the transcript, when one was mentioned.
    pub round: Option<Round>,
    /// Scores in the order they were announced.
    pub scores: Vec<ScoreEntry>,
}

/// Score written to the grid by [`apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedScore {
    /// Roster index.
    pub player_index: usize,
    /// Recorded value.
    pub score: i32,
}

/// What [`apply`] did with a parse result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterOutcome {
    /// Nothing valid survived validation; the grid is untouched.
    NoScoresDetected {
        /// Entries rejected by validation.
        dropped: usize,
    },
    /// At least one score was written.
    Applied {
        /// Round the scores were written to.
        round: Round,
        /// Scores written, in announcement order.
        applied: Vec<AppliedScore>,
        /// Entries rejected by validation.
        dropped: usize,
        /// Every roster index appears in `applied`.
        covers_roster: bool,
    },
}

/// Validate `result` against the grid and write its scores.
///
/// Targets `result.round`, or `current_round` when the transcript did not name
/// one. Reapplying the same result overwrites instead of accumulating.
pub fn apply(grid: &mut ScoreGrid, current_round: Round, result: &ParseResult) -> AdapterOutcome {
    let round = result.round.unwrap_or(current_round);
    let players = grid.player_count();

    let valid = result
        .scores
        .iter()
        .filter_map(|entry| validate(entry, players))
        .collect::<Vec<_>>();
    let dropped = result.scores.len() - valid.len();

    if valid.is_empty() {
        return AdapterOutcome::NoScoresDetected { dropped };
    }

    let mut applied = Vec::with_capacity(valid.len());
    for entry in valid {
        if grid
            .set_score(round, entry.player_index, entry.score)
            .is_ok()
        {
            applied.push(entry);
        }
    }

    let seen = applied
        .iter()
        .map(|entry| entry.player_index)
        .collect::<BTreeSet<_>>();

    AdapterOutcome::Applied {
        round,
        covers_roster: seen.len() == players,
        applied,
        dropped,
    }
}

fn validate(entry: &ScoreEntry, players: usize) -> Option<AppliedScore> {
    let player_index = usize::try_from(entry.player_index)
        .ok()
        .filter(|index| *index < players)?;
    let score = i32::try_from(entry.score)
        .ok()
        .filter(|score| (MIN_SCORE..=MAX_SCORE).contains(score))?;
    Some(AppliedScore {
        player_index,
        score,
    })
}
