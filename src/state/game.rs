use thiserror::Error;
use time::OffsetDateTime;

use crate::{
    dao::models::{CurrentGameEntity, NewGameRecord},
    state::{
        grid::{GridError, Round, Roster, RosterError, ScoreGrid},
        state_machine::GamePhase,
    },
};

/// Game currently being scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    /// Roster and scores.
    pub grid: ScoreGrid,
    /// When the game started.
    pub started_at: OffsetDateTime,
}

/// A cached game that can no longer be resumed.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// The cached roster breaks the game rules.
    #[error(transparent)]
    Roster(#[from] RosterError),
    /// The cached scores do not fit the roster.
    #[error(transparent)]
    Grid(#[from] GridError),
}

impl GameSession {
    /// Fresh game with every cell unset.
    pub fn new(roster: Roster) -> Self {
        Self {
            grid: ScoreGrid::new(roster),
            started_at: OffsetDateTime::now_utc(),
        }
    }

    /// Record to persist once the game is finished. Identity is left to the store.
    pub fn to_record(&self) -> NewGameRecord {
        NewGameRecord {
            id: None,
            date: None,
            player_names: self.grid.roster().names().to_vec(),
            scores: self.grid.rows(),
            final_totals: self.grid.totals(),
        }
    }

    /// Cache snapshot of the game at `phase`.
    pub fn to_entity(&self, phase: GamePhase) -> CurrentGameEntity {
        CurrentGameEntity {
            players: self.grid.roster().names().to_vec(),
            current_round: phase.current_round().unwrap_or(Round::LAST).number(),
            complete: phase == GamePhase::Complete,
            scores: self.grid.rows(),
            started_at: self.started_at,
        }
    }

    /// Rebuild a game and its phase from a cache snapshot.
    pub fn from_entity(entity: CurrentGameEntity) -> Result<(Self, GamePhase), RestoreError> {
        let roster = Roster::new(entity.players)?;
        let grid = ScoreGrid::from_rows(roster, entity.scores)?;
        let phase = if entity.complete {
            GamePhase::Complete
        } else {
            let round = Round::try_from(entity.current_round)?;
            GamePhase::Round(round)
        };
        Ok((
            Self {
                grid,
                started_at: entity.started_at,
            },
            phase,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> GameSession {
        GameSession::new(Roster::new(["Emma", "David"]).unwrap())
    }

    #[test]
    fn entity_round_trip_keeps_phase_and_cells() {
        let mut game = session();
        game.grid.set_score(Round::FIRST, 0, 0).unwrap();
        let phase = GamePhase::Round(Round::new(4).unwrap());

        let (restored, restored_phase) = GameSession::from_entity(game.to_entity(phase)).unwrap();

        assert_eq!(restored, game);
        assert_eq!(restored_phase, phase);
        assert_eq!(restored.grid.score(Round::FIRST, 0).unwrap(), Some(0));
        assert_eq!(restored.grid.score(Round::FIRST, 1).unwrap(), None);
    }

    #[test]
    fn complete_flag_restores_complete_phase() {
        let entity = session().to_entity(GamePhase::Complete);
        assert!(entity.complete);
        let (_, phase) = GameSession::from_entity(entity).unwrap();
        assert_eq!(phase, GamePhase::Complete);
    }

    #[test]
    fn invalid_cache_is_rejected() {
        let mut entity = session().to_entity(GamePhase::Round(Round::FIRST));
        entity.current_round = 12;
        assert!(matches!(
            GameSession::from_entity(entity.clone()),
            Err(RestoreError::Grid(GridError::RoundOutOfRange(12)))
        ));

        entity.current_round = 1;
        entity.scores[0].push(None);
        assert!(matches!(
            GameSession::from_entity(entity),
            Err(RestoreError::Grid(GridError::Shape { .. }))
        ));
    }

    #[test]
    fn record_carries_totals() {
        let mut game = session();
        game.grid.set_score(Round::FIRST, 0, 4).unwrap();
        game.grid.set_score(Round::LAST, 0, -1).unwrap();
        let record = game.to_record();
        assert_eq!(record.final_totals, vec![3, 0]);
        assert_eq!(record.scores.len(), 9);
        assert!(record.id.is_none());
    }
}
