use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    dao::models::GameRecord,
    dto::{
        session::{CaptureView, SessionView},
        sse::{ConnectivityEvent, PhaseChangedEvent, ServerEvent},
    },
    services::reconciler::Connectivity,
    state::{SharedState, grid::Round, state_machine::GamePhase},
};

const EVENT_SESSION: &str = "session.updated";
const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_GAME_SAVED: &str = "game.saved";
const EVENT_CAPTURE: &str = "capture";
const EVENT_CONNECTIVITY: &str = "connectivity";

/// Broadcast a snapshot of the running game after a mutation.
pub fn broadcast_session(state: &SharedState, view: &SessionView) {
    send_event(state, EVENT_SESSION, view);
}

/// Broadcast a phase change notification.
pub fn broadcast_phase_changed(state: &SharedState, phase: GamePhase) {
    let payload = PhaseChangedEvent {
        phase: phase.into(),
        current_round: phase.current_round().map(Round::number),
    };
    send_event(state, EVENT_PHASE_CHANGED, &payload);
}

/// Broadcast the record of a game that has just been saved.
pub fn broadcast_game_saved(state: &SharedState, game: &GameRecord) {
    send_event(state, EVENT_GAME_SAVED, game);
}

/// Broadcast that the microphone opened or closed.
pub fn broadcast_capture(state: &SharedState, capture: &CaptureView) {
    send_event(state, EVENT_CAPTURE, capture);
}

/// Broadcast a connectivity change.
pub fn broadcast_connectivity(state: &SharedState, connectivity: Connectivity) {
    send_event(state, EVENT_CONNECTIVITY, &ConnectivityEvent { connectivity });
}

/// Relay every connectivity change of the reconciler onto the SSE stream
/// until the reconciler goes away.
pub fn spawn_connectivity_forwarder(state: SharedState) -> JoinHandle<()> {
    let mut watcher = state.reconciler().connectivity_watcher();
    tokio::spawn(async move {
        while watcher.changed().await.is_ok() {
            let connectivity = *watcher.borrow_and_update();
            debug!(?connectivity, "forwarding connectivity change");
            broadcast_connectivity(&state, connectivity);
        }
    })
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.events().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
