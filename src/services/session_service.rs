//! Lifecycle of the single game being scored: start, score edits, round
//! progression, the final save and abandoning.
//!
//! Every mutation holds the `current_game` write lock for its whole duration,
//! writes the `currentGame` cache key and broadcasts the new session view.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    dao::models::GameRecord,
    dto::session::{SaveOutcome, ScoreUpdateResponse, SessionView, StandingView},
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        adapter::{self, AdapterOutcome, AppliedScore, ParseResult},
        game::GameSession,
        grid::{Roster, Round},
        state_machine::{GameEvent, GamePhase},
    },
};

/// Current session as seen by clients.
pub async fn session_view(state: &SharedState) -> SessionView {
    let slot = state.current_game().read().await;
    let phase = state.state_machine_phase().await;
    view_of(state, phase, slot.as_ref()).await
}

/// Start a game for `players`. Only allowed while no game is running.
pub async fn start_game(
    state: &SharedState,
    players: Vec<String>,
) -> Result<SessionView, ServiceError> {
    let roster = Roster::new(players)?;
    let mut slot = state.current_game().write().await;
    let session = GameSession::new(roster);

    let (_, phase) = state
        .run_transition(GameEvent::StartGame, || async { Ok(()) })
        .await?;
    persist(state, &session, phase).await;
    info!(players = ?session.grid.roster().names(), "game started");
    *slot = Some(session);

    let view = view_of(state, phase, slot.as_ref()).await;
    drop(slot);
    sse_events::broadcast_phase_changed(state, phase);
    sse_events::broadcast_session(state, &view);
    Ok(view)
}

/// Overwrite one cell. Any round of the running game may be edited.
pub async fn set_score(
    state: &SharedState,
    round: u8,
    player: usize,
    score: i32,
) -> Result<ScoreUpdateResponse, ServiceError> {
    let round = Round::try_from(round)?;
    let mut slot = state.current_game().write().await;
    let (game, _) = running_game(state, &mut slot).await?;
    game.grid.set_score(round, player, score)?;

    let outcome = AdapterOutcome::Applied {
        round,
        applied: vec![AppliedScore {
            player_index: player,
            score,
        }],
        dropped: 0,
        covers_roster: game.grid.is_round_complete(round),
    };
    after_mutation(state, &mut slot, outcome).await
}

/// Running game a transcript was parsed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameIdentity {
    /// Roster the parsed player indices refer to.
    pub players: Vec<String>,
    /// Start time of the game.
    pub started_at: OffsetDateTime,
}

/// Identity of the running game.
pub async fn identity(state: &SharedState) -> Result<GameIdentity, ServiceError> {
    let slot = state.current_game().read().await;
    slot.as_ref()
        .map(identity_of)
        .ok_or_else(|| ServiceError::InvalidState("no game is running".into()))
}

/// Apply a parsed transcript to the running game.
pub async fn apply_scores(
    state: &SharedState,
    result: ParseResult,
) -> Result<ScoreUpdateResponse, ServiceError> {
    apply_parsed(state, None, result).await
}

/// Apply scores parsed against `expected`. Fails when another game has
/// replaced it in the meantime.
pub async fn apply_scores_to(
    state: &SharedState,
    expected: &GameIdentity,
    result: ParseResult,
) -> Result<ScoreUpdateResponse, ServiceError> {
    apply_parsed(state, Some(expected), result).await
}

async fn apply_parsed(
    state: &SharedState,
    expected: Option<&GameIdentity>,
    result: ParseResult,
) -> Result<ScoreUpdateResponse, ServiceError> {
    let mut slot = state.current_game().write().await;
    let (game, current) = running_game(state, &mut slot).await?;
    if let Some(expected) = expected {
        if identity_of(game) != *expected {
            return Err(ServiceError::InvalidState(
                "the game changed while the transcript was parsed".into(),
            ));
        }
    }
    let outcome = adapter::apply(&mut game.grid, current, &result);
    if let AdapterOutcome::NoScoresDetected { dropped } = outcome {
        info!(dropped, "no scores detected");
    }
    after_mutation(state, &mut slot, outcome).await
}

/// Standings of the running game, lowest total first.
pub async fn leaderboard(state: &SharedState) -> Result<Vec<StandingView>, ServiceError> {
    let slot = state.current_game().read().await;
    let game = slot
        .as_ref()
        .ok_or_else(|| ServiceError::InvalidState("no game is running".into()))?;
    Ok(game
        .grid
        .leaderboard()
        .into_iter()
        .map(Into::into)
        .collect())
}

/// Save a complete game whose automatic save failed.
pub async fn finish_game(state: &SharedState) -> Result<GameRecord, ServiceError> {
    let mut slot = state.current_game().write().await;
    let saved = finish_locked(state, &mut slot).await?;
    let phase = state.state_machine_phase().await;
    let view = view_of(state, phase, slot.as_ref()).await;
    drop(slot);
    sse_events::broadcast_session(state, &view);
    Ok(saved)
}

/// Discard the running game without saving it and reload history from the
/// store. A complete game must be saved first.
pub async fn reset_game(state: &SharedState) -> Result<SessionView, ServiceError> {
    let mut slot = state.current_game().write().await;
    if state.state_machine_phase().await != GamePhase::Idle {
        let (_, phase) = state
            .run_transition(GameEvent::AbandonGame, || async { Ok(()) })
            .await?;
        info!("game abandoned");
        sse_events::broadcast_phase_changed(state, phase);
    }
    *slot = None;
    if let Err(err) = state.reconciler().clear_current_game().await {
        warn!(error = %err, "failed to clear the cached game");
    }
    state.reconciler().refresh().await;

    let view = view_of(state, GamePhase::Idle, None).await;
    drop(slot);
    sse_events::broadcast_session(state, &view);
    Ok(view)
}

/// Reinstall the game cached by a previous run. A cache entry that can no
/// longer be resumed is discarded.
pub async fn restore_session(state: &SharedState) -> Result<Option<GamePhase>, ServiceError> {
    let Some(entity) = state.reconciler().load_current_game().await? else {
        return Ok(None);
    };
    match GameSession::from_entity(entity) {
        Ok((session, phase)) => {
            state.restore(session, phase).await?;
            info!(?phase, "resumed cached game");
            Ok(Some(phase))
        }
        Err(err) => {
            warn!(error = %err, "discarding unusable cached game");
            state.reconciler().clear_current_game().await?;
            Ok(None)
        }
    }
}

/// Roster of the running game.
pub async fn roster(state: &SharedState) -> Result<Vec<String>, ServiceError> {
    let slot = state.current_game().read().await;
    slot.as_ref()
        .map(|game| game.grid.roster().names().to_vec())
        .ok_or_else(|| ServiceError::InvalidState("no game is running".into()))
}

fn identity_of(game: &GameSession) -> GameIdentity {
    GameIdentity {
        players: game.grid.roster().names().to_vec(),
        started_at: game.started_at,
    }
}

async fn view_of(state: &SharedState, phase: GamePhase, game: Option<&GameSession>) -> SessionView {
    let capture = state.capture().lock().await.phase();
    SessionView::new(phase, game, state.reconciler().connectivity(), capture)
}

/// Game open for score edits, with its current round.
async fn running_game<'a>(
    state: &SharedState,
    slot: &'a mut Option<GameSession>,
) -> Result<(&'a mut GameSession, Round), ServiceError> {
    let phase = state.state_machine_phase().await;
    let round = match phase {
        GamePhase::Round(round) => round,
        GamePhase::Complete => {
            return Err(ServiceError::InvalidState(
                "the game is complete and waiting to be saved".into(),
            ));
        }
        GamePhase::Idle => {
            return Err(ServiceError::InvalidState("no game is running".into()));
        }
    };
    let game = slot
        .as_mut()
        .ok_or_else(|| ServiceError::InvalidState("no game is running".into()))?;
    Ok((game, round))
}

/// Progress rounds, cache the game, and save it once every round is scored.
async fn after_mutation(
    state: &SharedState,
    slot: &mut Option<GameSession>,
    outcome: AdapterOutcome,
) -> Result<ScoreUpdateResponse, ServiceError> {
    let changed = matches!(outcome, AdapterOutcome::Applied { .. });
    let entered = match slot.as_ref() {
        Some(game) if changed => {
            state
                .advance_rounds(|round| game.grid.is_round_complete(round))
                .await?
        }
        _ => Vec::new(),
    };

    let phase = state.state_machine_phase().await;
    if changed {
        if let Some(game) = slot.as_ref() {
            persist(state, game, phase).await;
        }
    }
    for entered_phase in &entered {
        sse_events::broadcast_phase_changed(state, *entered_phase);
    }

    let save = if phase == GamePhase::Complete {
        Some(match finish_locked(state, slot).await {
            Ok(game) => SaveOutcome::Saved { game },
            Err(err) => {
                warn!(error = %err, "saving the finished game failed; it stays complete");
                SaveOutcome::Failed {
                    error: err.to_string(),
                }
            }
        })
    } else {
        None
    };

    let phase = state.state_machine_phase().await;
    let view = view_of(state, phase, slot.as_ref()).await;
    sse_events::broadcast_session(state, &view);
    Ok(ScoreUpdateResponse::new(outcome, view, save))
}

/// Record the complete game through the reconciler, then leave it.
async fn finish_locked(
    state: &SharedState,
    slot: &mut Option<GameSession>,
) -> Result<GameRecord, ServiceError> {
    let record = slot
        .as_ref()
        .map(GameSession::to_record)
        .ok_or_else(|| ServiceError::InvalidState("no finished game to save".into()))?;
    let reconciler = Arc::clone(state.reconciler());

    let (saved, phase) = state
        .run_transition(GameEvent::GameSaved, move || async move {
            reconciler.save_game(record).await
        })
        .await?;

    *slot = None;
    if let Err(err) = state.reconciler().clear_current_game().await {
        warn!(error = %err, "failed to clear the cached game");
    }
    info!(id = %saved.id, date = %saved.date, "finished game saved");
    sse_events::broadcast_game_saved(state, &saved);
    sse_events::broadcast_phase_changed(state, phase);
    Ok(saved)
}

async fn persist(state: &SharedState, game: &GameSession, phase: GamePhase) {
    if let Err(err) = state
        .reconciler()
        .save_current_game(&game.to_entity(phase))
        .await
    {
        warn!(error = %err, "failed to cache the running game");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::{phase::VisibleGamePhase, session::Detection},
        state::adapter::ScoreEntry,
        test_support::test_state,
    };

    fn players() -> Vec<String> {
        vec!["Emma".into(), "David".into()]
    }

    fn entries(scores: &[(i64, i64)]) -> Vec<ScoreEntry> {
        scores
            .iter()
            .map(|&(player_index, score)| ScoreEntry {
                player_index,
                score,
            })
            .collect()
    }

    #[tokio::test]
    async fn start_requires_idle_and_a_valid_roster() {
        let (state, _harness) = test_state();

        let err = start_game(&state, vec!["Solo".into()]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let view = start_game(&state, players()).await.unwrap();
        assert_eq!(view.phase, VisibleGamePhase::Round);
        assert_eq!(view.current_round, Some(1));
        assert_eq!(view.scores, vec![vec![None, None]; 9]);

        let err = start_game(&state, players()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn completing_a_round_advances_and_caches() {
        let (state, harness) = test_state();
        start_game(&state, players()).await.unwrap();

        let first = set_score(&state, 1, 0, 4).await.unwrap();
        assert_eq!(first.session.current_round, Some(1));
        assert!(!first.covers_roster);

        let second = set_score(&state, 1, 1, 0).await.unwrap();
        assert_eq!(second.session.current_round, Some(2));
        assert!(second.covers_roster);
        assert_eq!(second.session.totals, vec![4, 0]);

        let cached = harness.reconciler.load_current_game().await.unwrap().unwrap();
        assert_eq!(cached.current_round, 2);
        assert_eq!(cached.scores[0], vec![Some(4), Some(0)]);
    }

    #[tokio::test]
    async fn editing_earlier_rounds_is_allowed_and_never_moves_back() {
        let (state, _harness) = test_state();
        start_game(&state, players()).await.unwrap();
        set_score(&state, 1, 0, 4).await.unwrap();
        set_score(&state, 1, 1, 5).await.unwrap();

        let edit = set_score(&state, 1, 0, -2).await.unwrap();

        assert_eq!(edit.session.current_round, Some(2));
        assert_eq!(edit.session.scores[0], vec![Some(-2), Some(5)]);
    }

    #[tokio::test]
    async fn prefilled_rounds_cascade() {
        let (state, _harness) = test_state();
        start_game(&state, players()).await.unwrap();
        set_score(&state, 2, 0, 1).await.unwrap();
        set_score(&state, 2, 1, 1).await.unwrap();
        set_score(&state, 1, 0, 1).await.unwrap();

        let update = set_score(&state, 1, 1, 1).await.unwrap();

        assert_eq!(update.session.current_round, Some(3));
    }

    #[tokio::test]
    async fn out_of_range_cells_are_rejected() {
        let (state, _harness) = test_state();
        start_game(&state, players()).await.unwrap();

        assert!(matches!(
            set_score(&state, 10, 0, 1).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            set_score(&state, 1, 2, 1).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn scores_need_a_running_game() {
        let (state, _harness) = test_state();
        assert!(matches!(
            set_score(&state, 1, 0, 1).await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            apply_scores(&state, ParseResult::default()).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn no_valid_entries_leave_the_grid_untouched() {
        let (state, harness) = test_state();
        start_game(&state, players()).await.unwrap();

        let update = apply_scores(
            &state,
            ParseResult {
                round: None,
                scores: entries(&[(5, 1), (0, 5000)]),
            },
        )
        .await
        .unwrap();

        assert_eq!(update.detection, Detection::NoScoresDetected);
        assert_eq!(update.dropped, 2);
        assert_eq!(update.session.scores, vec![vec![None, None]; 9]);
        let cached = harness.reconciler.load_current_game().await.unwrap().unwrap();
        assert_eq!(cached.scores, vec![vec![None, None]; 9]);
    }

    #[tokio::test]
    async fn full_game_saves_and_returns_to_idle() {
        let (state, harness) = test_state();
        harness.reconciler.refresh().await;
        start_game(&state, players()).await.unwrap();

        let mut last = None;
        for round in 1..=9u8 {
            last = Some(
                apply_scores(
                    &state,
                    ParseResult {
                        round: Round::new(round),
                        scores: entries(&[(0, 1), (1, 2)]),
                    },
                )
                .await
                .unwrap(),
            );
        }
        let last = last.unwrap();

        let game = match last.save {
            Some(SaveOutcome::Saved { game }) => game,
            other => panic!("expected the game to be saved, got {other:?}"),
        };
        assert_eq!(game.final_totals, vec![9, 18]);
        assert_eq!(game.player_names, players());
        assert_eq!(harness.store.games().len(), 1);
        assert_eq!(last.session.phase, VisibleGamePhase::Idle);
        assert!(harness.reconciler.load_current_game().await.unwrap().is_none());

        start_game(&state, players()).await.unwrap();
    }

    #[tokio::test]
    async fn failed_save_keeps_the_game_until_finish_succeeds() {
        let (state, harness) = test_state();
        harness.reconciler.refresh().await;
        harness.store.set_failing_writes(true);
        start_game(&state, players()).await.unwrap();
        for round in 1..=9u8 {
            set_score(&state, round, 0, 0).await.unwrap();
            let update = set_score(&state, round, 1, 0).await.unwrap();
            if round == 9 {
                assert!(matches!(update.save, Some(SaveOutcome::Failed { .. })));
                assert_eq!(update.session.phase, VisibleGamePhase::Complete);
            }
        }

        assert!(matches!(
            set_score(&state, 9, 0, 3).await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            reset_game(&state).await,
            Err(ServiceError::InvalidState(_))
        ));
        let cached = harness.reconciler.load_current_game().await.unwrap().unwrap();
        assert!(cached.complete);

        harness.store.set_failing_writes(false);
        let saved = finish_game(&state).await.unwrap();
        assert_eq!(saved.final_totals, vec![0, 0]);
        assert_eq!(state.state_machine_phase().await, GamePhase::Idle);
    }

    #[tokio::test]
    async fn offline_completion_saves_locally() {
        let (state, harness) = test_state();
        harness.store.set_online(false);
        harness.reconciler.refresh().await;
        start_game(&state, players()).await.unwrap();
        for round in 1..=9u8 {
            apply_scores(
                &state,
                ParseResult {
                    round: Round::new(round),
                    scores: entries(&[(0, 3), (1, 3)]),
                },
            )
            .await
            .unwrap();
        }

        let games = harness.reconciler.games().await;
        assert_eq!(games.len(), 1);
        assert!(harness.store.games().is_empty());
        assert_eq!(state.state_machine_phase().await, GamePhase::Idle);
    }

    #[tokio::test]
    async fn reset_abandons_without_saving() {
        let (state, harness) = test_state();
        start_game(&state, players()).await.unwrap();
        set_score(&state, 1, 0, 7).await.unwrap();

        let view = reset_game(&state).await.unwrap();

        assert_eq!(view.phase, VisibleGamePhase::Idle);
        assert!(harness.store.games().is_empty());
        assert!(harness.reconciler.load_current_game().await.unwrap().is_none());
        assert!(reset_game(&state).await.is_ok());
    }

    #[tokio::test]
    async fn cached_game_is_restored() {
        let (state, harness) = test_state();
        start_game(&state, players()).await.unwrap();
        set_score(&state, 1, 0, 2).await.unwrap();
        set_score(&state, 1, 1, 3).await.unwrap();

        let (fresh, _) = crate::test_support::test_state_with(harness.reconciler.clone());
        let phase = restore_session(&fresh).await.unwrap();

        assert_eq!(phase, Some(GamePhase::Round(Round::new(2).unwrap())));
        let view = session_view(&fresh).await;
        assert_eq!(view.totals, vec![2, 3]);
        assert_eq!(roster(&fresh).await.unwrap(), players());
    }

    #[tokio::test]
    async fn scores_parsed_for_a_replaced_game_are_refused() {
        let (state, _harness) = test_state();
        start_game(&state, players()).await.unwrap();
        let parsed_for = identity(&state).await.unwrap();
        assert_eq!(parsed_for.players, players());

        reset_game(&state).await.unwrap();
        start_game(&state, vec!["Tanner".into(), "Danni".into(), "Rob".into()])
            .await
            .unwrap();
        let result = ParseResult {
            round: None,
            scores: entries(&[(0, 4), (1, 2)]),
        };

        let err = apply_scores_to(&state, &parsed_for, result.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(session_view(&state).await.scores[0], vec![None, None, None]);

        let current = identity(&state).await.unwrap();
        let update = apply_scores_to(&state, &current, result).await.unwrap();
        assert_eq!(update.session.scores[0], vec![Some(4), Some(2), None]);
    }

    #[tokio::test]
    async fn leaderboard_orders_by_total() {
        let (state, _harness) = test_state();
        assert!(leaderboard(&state).await.is_err());
        start_game(&state, players()).await.unwrap();
        set_score(&state, 1, 0, 9).await.unwrap();

        let board = leaderboard(&state).await.unwrap();
        assert_eq!(board[0].name, "David");
        assert_eq!(board[1].total, 9);
    }
}
