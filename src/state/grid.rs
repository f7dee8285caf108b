//! Round-by-round score grid for a fixed roster of players.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of rounds ("holes") in a game of Play Nine.
pub const ROUND_COUNT: usize = 9;
/// Smallest roster accepted for a game.
pub const MIN_PLAYERS: usize = 2;
/// Largest roster accepted for a game.
pub const MAX_PLAYERS: usize = 6;
/// Lowest score a single round may record through voice input.
pub const MIN_SCORE: i32 = -999;
/// Highest score a single round may record through voice input.
pub const MAX_SCORE: i32 = 999;

/// A round number, guaranteed to lie in `1..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Round(u8);

impl Round {
    /// Opening round of every game.
    pub const FIRST: Round = Round(1);
    /// Final round; completing it ends the game.
    pub const LAST: Round = Round(ROUND_COUNT as u8);

    /// Build a round from its 1-based number.
    pub fn new(number: u8) -> Option<Self> {
        (1..=ROUND_COUNT as u8).contains(&number).then_some(Self(number))
    }

    /// 1-based round number.
    pub fn number(self) -> u8 {
        self.0
    }

    /// 0-based index into the grid rows.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Following round, or `None` after the last one.
    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    /// Iterate over every round in play order.
    pub fn all() -> impl Iterator<Item = Round> {
        (1..=ROUND_COUNT as u8).map(Round)
    }
}

impl TryFrom<u8> for Round {
    type Error = GridError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(GridError::RoundOutOfRange(i64::from(value)))
    }
}

impl From<Round> for u8 {
    fn from(value: Round) -> Self {
        value.0
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while building or addressing a [`ScoreGrid`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Round number outside `1..=9`.
    #[error("round {0} is outside 1..=9")]
    RoundOutOfRange(i64),
    /// Player index outside the roster.
    #[error("player index {index} is outside the roster of {players} players")]
    PlayerOutOfRange {
        /// Offending index.
        index: usize,
        /// Roster size.
        players: usize,
    },
    /// Persisted rows do not match the roster dimensions.
    #[error("score rows do not match the roster (expected {expected} columns per round)")]
    Shape {
        /// Roster size every row must match.
        expected: usize,
    },
}

/// Errors raised when a roster does not meet the game rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    /// Fewer players than [`MIN_PLAYERS`] or more than [`MAX_PLAYERS`].
    #[error("a game needs between 2 and 6 players (got {0})")]
    Size(usize),
    /// A blank name was supplied at the given position.
    #[error("player #{0} has an empty name")]
    EmptyName(usize),
}

/// Ordered player names, fixed for the lifetime of one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster(Vec<String>);

impl Roster {
    /// Validate and trim the provided names.
    pub fn new<I, S>(names: I) -> Result<Self, RosterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .enumerate()
            .map(|(position, name)| {
                let trimmed = name.as_ref().trim();
                if trimmed.is_empty() {
                    Err(RosterError::EmptyName(position + 1))
                } else {
                    Ok(trimmed.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&names.len()) {
            return Err(RosterError::Size(names.len()));
        }

        Ok(Self(names))
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated roster; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Player names in seating order.
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// Player name from the roster.
    pub name: String,
    /// Sum of every round, unset rounds counting as zero.
    pub total: i32,
}

/// Nine rounds of scores for a fixed roster. `None` marks a cell nobody has
/// recorded yet, so a real score of zero stays distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreGrid {
    roster: Roster,
    rounds: Vec<Vec<Option<i32>>>,
}

impl ScoreGrid {
    /// Empty grid for the roster.
    pub fn new(roster: Roster) -> Self {
        let rounds = vec![vec![None; roster.len()]; ROUND_COUNT];
        Self { roster, rounds }
    }

    /// Rebuild a grid from persisted rows. Missing trailing rounds are
    /// treated as unset; rows must otherwise match the roster width.
    pub fn from_rows(roster: Roster, rows: Vec<Vec<Option<i32>>>) -> Result<Self, GridError> {
        let players = roster.len();
        if rows.len() > ROUND_COUNT || rows.iter().any(|row| row.len() != players) {
            return Err(GridError::Shape { expected: players });
        }

        let mut grid = Self::new(roster);
        for (index, row) in rows.into_iter().enumerate() {
            grid.rounds[index] = row;
        }
        Ok(grid)
    }

    /// Roster the grid was created for.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Number of players.
    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    /// Record (or overwrite) a score.
    pub fn set_score(&mut self, round: Round, player: usize, value: i32) -> Result<(), GridError> {
        self.check_player(player)?;
        self.rounds[round.index()][player] = Some(value);
        Ok(())
    }

    /// Recorded score for a cell, if any.
    pub fn score(&self, round: Round, player: usize) -> Result<Option<i32>, GridError> {
        self.check_player(player)?;
        Ok(self.rounds[round.index()][player])
    }

    /// Sum of rounds `1..=through` for a player.
    pub fn subtotal(&self, player: usize, through: Round) -> Result<i32, GridError> {
        self.check_player(player)?;
        Ok(self.rounds[..=through.index()]
            .iter()
            .map(|row| row[player].unwrap_or(0))
            .sum())
    }

    /// Sum of all nine rounds for a player.
    pub fn total(&self, player: usize) -> Result<i32, GridError> {
        self.subtotal(player, Round::LAST)
    }

    /// Totals for every player in roster order.
    pub fn totals(&self) -> Vec<i32> {
        self.subtotals(Round::LAST)
    }

    /// Subtotals for every player in roster order.
    pub fn subtotals(&self, through: Round) -> Vec<i32> {
        (0..self.player_count())
            .map(|player| {
                self.rounds[..=through.index()]
                    .iter()
                    .map(|row| row[player].unwrap_or(0))
                    .sum()
            })
            .collect()
    }

    /// True once every player has a recorded score for the round.
    pub fn is_round_complete(&self, round: Round) -> bool {
        self.rounds[round.index()].iter().all(Option::is_some)
    }

    /// Players ordered by ascending total (lowest wins); ties keep roster order.
    pub fn leaderboard(&self) -> Vec<Standing> {
        let mut standings = self
            .roster
            .names()
            .iter()
            .zip(self.totals())
            .map(|(name, total)| Standing {
                name: name.clone(),
                total,
            })
            .collect::<Vec<_>>();
        standings.sort_by_key(|standing| standing.total);
        standings
    }

    /// Copy of the nine rows.
    pub fn rows(&self) -> Vec<Vec<Option<i32>>> {
        self.rounds.clone()
    }

    fn check_player(&self, player: usize) -> Result<(), GridError> {
        if player < self.player_count() {
            Ok(())
        } else {
            Err(GridError::PlayerOutOfRange {
                index: player,
                players: self.player_count(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(n: u8) -> Round {
        Round::new(n).unwrap()
    }

    fn grid(names: &[&str]) -> ScoreGrid {
        ScoreGrid::new(Roster::new(names.iter().copied()).unwrap())
    }

    #[test]
    fn round_bounds_are_enforced() {
        assert!(Round::new(0).is_none());
        assert!(Round::new(10).is_none());
        assert_eq!(Round::new(9), Some(Round::LAST));
        assert_eq!(Round::LAST.next(), None);
        assert_eq!(Round::FIRST.next(), Some(round(2)));
        assert_eq!(Round::all().count(), ROUND_COUNT);
    }

    #[test]
    fn roster_rejects_bad_sizes_and_blank_names() {
        assert_eq!(Roster::new(["solo"]).unwrap_err(), RosterError::Size(1));
        assert_eq!(
            Roster::new(["a", "b", "c", "d", "e", "f", "g"]).unwrap_err(),
            RosterError::Size(7)
        );
        assert_eq!(
            Roster::new(["a", "  "]).unwrap_err(),
            RosterError::EmptyName(2)
        );
        let roster = Roster::new([" Ann ", "Bob"]).unwrap();
        assert_eq!(roster.names(), ["Ann".to_string(), "Bob".to_string()]);
    }

    #[test]
    fn set_score_reads_back_and_overwrites() {
        let mut grid = grid(&["A", "B", "C"]);
        for r in Round::all() {
            for player in 0..3 {
                let value = i32::from(r.number()) * 10 - player as i32;
                grid.set_score(r, player, value).unwrap();
                assert_eq!(grid.score(r, player).unwrap(), Some(value));
            }
        }

        grid.set_score(round(4), 1, -7).unwrap();
        assert_eq!(grid.score(round(4), 1).unwrap(), Some(-7));
    }

    #[test]
    fn set_score_rejects_unknown_player() {
        let mut grid = grid(&["A", "B"]);
        assert_eq!(
            grid.set_score(round(1), 2, 3).unwrap_err(),
            GridError::PlayerOutOfRange {
                index: 2,
                players: 2
            }
        );
    }

    #[test]
    fn zero_is_a_recorded_score() {
        let mut grid = grid(&["A", "B"]);
        grid.set_score(round(3), 0, 0).unwrap();
        assert!(!grid.is_round_complete(round(3)));
        grid.set_score(round(3), 1, 0).unwrap();
        assert!(grid.is_round_complete(round(3)));
    }

    #[test]
    fn completing_the_last_missing_cell_completes_the_round() {
        let mut grid = grid(&["A", "B", "C", "D"]);
        for player in 0..3 {
            grid.set_score(round(2), player, 4).unwrap();
        }
        assert!(!grid.is_round_complete(round(2)));
        grid.set_score(round(2), 3, 1).unwrap();
        assert!(grid.is_round_complete(round(2)));
    }

    #[test]
    fn total_matches_subtotal_through_last_round() {
        let mut grid = grid(&["A", "B"]);
        grid.set_score(round(1), 0, 5).unwrap();
        grid.set_score(round(5), 0, -3).unwrap();
        grid.set_score(round(9), 1, 12).unwrap();

        for player in 0..2 {
            assert_eq!(
                grid.total(player).unwrap(),
                grid.subtotal(player, Round::LAST).unwrap()
            );
        }
        assert_eq!(grid.subtotal(0, round(4)).unwrap(), 5);
        assert_eq!(grid.subtotal(0, round(5)).unwrap(), 2);
        assert_eq!(grid.totals(), vec![2, 12]);
    }

    #[test]
    fn leaderboard_sorts_ascending_and_keeps_roster_order_on_ties() {
        let mut grid = grid(&["Ann", "Bob", "Cid", "Dee"]);
        grid.set_score(round(1), 0, 10).unwrap();
        grid.set_score(round(1), 1, 3).unwrap();
        grid.set_score(round(1), 2, 10).unwrap();
        grid.set_score(round(1), 3, 3).unwrap();

        let names = grid
            .leaderboard()
            .into_iter()
            .map(|standing| standing.name)
            .collect::<Vec<_>>();
        assert_eq!(names, ["Bob", "Dee", "Ann", "Cid"]);
    }

    #[test]
    fn full_game_totals() {
        let rows = [
            [1, 2],
            [3, 1],
            [0, 0],
            [5, 5],
            [-2, 3],
            [4, 4],
            [1, 1],
            [2, 2],
            [3, 3],
        ];
        let mut grid = grid(&["A", "B"]);
        for (r, row) in Round::all().zip(rows) {
            for (player, value) in row.into_iter().enumerate() {
                grid.set_score(r, player, value).unwrap();
            }
        }

        assert_eq!(grid.totals(), vec![17, 21]);
        assert_eq!(
            grid.leaderboard(),
            vec![
                Standing {
                    name: "A".into(),
                    total: 17
                },
                Standing {
                    name: "B".into(),
                    total: 21
                },
            ]
        );
    }

    #[test]
    fn from_rows_validates_shape() {
        let roster = Roster::new(["A", "B"]).unwrap();
        let grid =
            ScoreGrid::from_rows(roster.clone(), vec![vec![Some(1), None], vec![Some(2), Some(3)]])
                .unwrap();
        assert_eq!(grid.score(round(2), 1).unwrap(), Some(3));
        assert_eq!(grid.score(round(9), 0).unwrap(), None);

        assert_eq!(
            ScoreGrid::from_rows(roster, vec![vec![Some(1)]]).unwrap_err(),
            GridError::Shape { expected: 2 }
        );
    }
}
