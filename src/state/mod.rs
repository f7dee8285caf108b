/// Applying parsed scores to the grid.
pub mod adapter;
/// Voice capture machine.
pub mod capture;
/// Running game data.
pub mod game;
/// Score grid and roster.
pub mod grid;
mod sse;
/// Game phase transitions.
pub mod state_machine;

use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    dao::game_store::GameStore,
    error::ServiceError,
    services::{reconciler::Reconciler, transcript_parser::TranscriptParser},
    state::{capture::CaptureMachine, game::GameSession, grid::Round, state_machine::GamePhase},
};

pub use self::sse::SseHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
use self::state_machine::{GameEvent, GameStateMachine};

/// State shared by every handler.
pub type SharedState = Arc<AppState>;
/// Upper bound for applying a planned transition.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(15);
const EVENT_CAPACITY: usize = 32;

/// Central application state: the running game, its persistence and the
/// collaborators used to parse transcripts.
///
/// Locks are always taken in the order `current_game`, `transition_gate`,
/// `game`.
pub struct AppState {
    api_store: Arc<dyn GameStore>,
    reconciler: Arc<Reconciler>,
    parser: TranscriptParser,
    events: SseHub,
    game: RwLock<GameStateMachine>,
    current_game: RwLock<Option<GameSession>>,
    capture: Mutex<CaptureMachine>,
    transition_gate: Mutex<()>,
    transcript_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// `api_store` backs the `/api` surface; `reconciler` owns the session's
    /// view of the (possibly remote) store.
    pub fn new(
        api_store: Arc<dyn GameStore>,
        reconciler: Arc<Reconciler>,
        parser: TranscriptParser,
    ) -> SharedState {
        Arc::new(Self {
            api_store,
            reconciler,
            parser,
            events: SseHub::new(EVENT_CAPACITY),
            game: RwLock::new(GameStateMachine::new()),
            current_game: RwLock::new(None),
            capture: Mutex::new(CaptureMachine::new()),
            transition_gate: Mutex::new(()),
            transcript_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        })
    }

    /// Store served directly over `/api`.
    pub fn api_store(&self) -> &Arc<dyn GameStore> {
        &self.api_store
    }

    /// Remote-first persistence used by the session.
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Transcript parser and the model settings it uses.
    pub fn parser(&self) -> &TranscriptParser {
        &self.parser
    }

    /// Broadcast hub behind `/sse/events`.
    pub fn events(&self) -> &SseHub {
        &self.events
    }

    /// Currently active game session data.
    pub fn current_game(&self) -> &RwLock<Option<GameSession>> {
        &self.current_game
    }

    /// Voice capture machine.
    pub fn capture(&self) -> &Mutex<CaptureMachine> {
        &self.capture
    }

    /// Held while one transcript is parsed and applied.
    pub fn transcript_gate(&self) -> &Mutex<()> {
        &self.transcript_gate
    }

    /// Snapshot the current phase of the shared game state machine.
    pub async fn state_machine_phase(&self) -> GamePhase {
        self.game.read().await.phase()
    }

    /// Phase and version of the state machine.
    pub async fn snapshot(&self) -> Snapshot {
        let sm = self.game.read().await;
        sm.snapshot()
    }

    /// Put a game left by a previous run back in place. Only valid while idle.
    pub async fn restore(&self, session: GameSession, phase: GamePhase) -> Result<(), ServiceError> {
        let mut slot = self.current_game.write().await;
        let _gate = self.transition_gate.lock().await;
        let mut sm = self.game.write().await;
        if sm.phase() != GamePhase::Idle || slot.is_some() {
            return Err(ServiceError::InvalidState(
                "a game is already running".into(),
            ));
        }
        *sm = GameStateMachine::resume(phase);
        *slot = Some(session);
        Ok(())
    }

    /// Move past every fully scored round, starting at the current one.
    /// Returns the phases entered in order.
    pub async fn advance_rounds<F>(&self, is_complete: F) -> Result<Vec<GamePhase>, ServiceError>
    where
        F: Fn(Round) -> bool,
    {
        let _gate = self.transition_gate.lock().await;
        let mut sm = self.game.write().await;
        Ok(sm.advance_while(is_complete)?)
    }

    /// Plan a transition to the shared game state machine, returning the plan.
    async fn plan_transition(&self, event: GameEvent) -> Result<Plan, PlanError> {
        let mut sm = self.game.write().await;
        sm.plan(event)
    }

    /// Apply the planned transition to the shared game state machine, returning the next phase.
    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<GamePhase, ApplyError> {
        let mut sm = self.game.write().await;
        sm.apply(plan_id)
    }

    /// Abort a planned transition of the shared game state machine
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.game.write().await;
        sm.abort(plan_id)
    }

    /// Plan `event`, run `work`, then apply the plan when the work succeeds
    /// or abort it when the work fails or exceeds the transition timeout.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: GameEvent,
        work: F,
    ) -> Result<(T, GamePhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = self.abort_transition(plan_id).await {
                        warn!(
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    #[tokio::test]
    async fn failed_work_leaves_phase_untouched() {
        let (state, _) = test_state();

        let err = state
            .run_transition(GameEvent::StartGame, || async {
                Err::<(), _>(ServiceError::InvalidInput("no".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidInput(_)));
        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.phase, GamePhase::Idle);
        assert_eq!(snapshot.pending, None);
    }

    #[tokio::test]
    async fn successful_work_applies_the_plan() {
        let (state, _) = test_state();

        let (value, next) = state
            .run_transition(GameEvent::StartGame, || async { Ok(7) })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(next, GamePhase::Round(Round::FIRST));
        assert_eq!(state.state_machine_phase().await, next);
    }

    #[tokio::test]
    async fn invalid_event_is_rejected_before_work_runs() {
        let (state, _) = test_state();
        let mut ran = false;

        let err = state
            .run_transition(GameEvent::GameSaved, || {
                ran = true;
                async { Ok(()) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert!(!ran);
    }

    #[tokio::test]
    async fn restore_requires_idle() {
        let (state, _) = test_state();
        let roster = crate::state::grid::Roster::new(["Ann", "Bob"]).unwrap();
        let phase = GamePhase::Round(Round::new(3).unwrap());

        state
            .restore(GameSession::new(roster.clone()), phase)
            .await
            .unwrap();
        assert_eq!(state.state_machine_phase().await, phase);

        let again = state.restore(GameSession::new(roster), phase).await;
        assert!(matches!(again, Err(ServiceError::InvalidState(_))));
    }
}
