//! Voice input: listening sessions and transcripts parsed through the
//! completion API. Transcripts are processed one at a time.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::session::{
        CaptureView, ScoreUpdateResponse, SessionView, UtteranceResponse, WelcomeResponse,
    },
    error::ServiceError,
    services::{session_service, sse_events, transcript_parser::ParserError},
    state::{SharedState, adapter::ParseResult, state_machine::GamePhase},
};

/// Parse `transcript` for scores and apply them to the running game.
///
/// A reply the parser cannot decode counts as "no scores detected"; a failing
/// completion API is an error. Scores are refused when another game replaced
/// the one the transcript was parsed against.
pub async fn process_transcript(
    state: &SharedState,
    transcript: &str,
) -> Result<ScoreUpdateResponse, ServiceError> {
    let _gate = state.transcript_gate().lock().await;
    let game = session_service::identity(state).await?;

    let result = match state.parser().parse_scores(transcript, &game.players).await {
        Ok(result) => result,
        Err(ParserError::Malformed(reason)) => {
            warn!(%reason, "score reply could not be decoded");
            ParseResult::default()
        }
        Err(ParserError::Completion(err)) => return Err(ServiceError::Parser(err.to_string())),
    };
    info!(
        round = ?result.round,
        entries = result.scores.len(),
        "transcript parsed"
    );
    session_service::apply_scores_to(state, &game, result).await
}

/// Parse the roster announced in `transcript` and start a game with it.
pub async fn setup_from_transcript(
    state: &SharedState,
    transcript: &str,
) -> Result<SessionView, ServiceError> {
    let _gate = state.transcript_gate().lock().await;
    if state.state_machine_phase().await != GamePhase::Idle {
        return Err(ServiceError::InvalidState("a game is already running".into()));
    }

    let players = match state.parser().parse_setup(transcript).await {
        Ok(players) => players,
        Err(ParserError::Malformed(reason)) => {
            return Err(ServiceError::InvalidInput(format!(
                "could not find 2 to 6 player names: {reason}"
            )));
        }
        Err(ParserError::Completion(err)) => return Err(ServiceError::Parser(err.to_string())),
    };
    session_service::start_game(state, players).await
}

/// Open the microphone.
pub async fn start_capture(state: &SharedState) -> Result<CaptureView, ServiceError> {
    let view = {
        let mut capture = state.capture().lock().await;
        capture.start()?;
        CaptureView::from(capture.phase())
    };
    sse_events::broadcast_capture(state, &view);
    Ok(view)
}

/// Close the microphone without processing anything.
pub async fn cancel_capture(state: &SharedState) -> Result<CaptureView, ServiceError> {
    let view = {
        let mut capture = state.capture().lock().await;
        let id = capture.cancel()?;
        info!(%id, "listening session cancelled");
        CaptureView::from(capture.phase())
    };
    sse_events::broadcast_capture(state, &view);
    Ok(view)
}

/// Close the listening session with its transcript. While idle the
/// transcript names the players of a new game; during a game it announces
/// scores.
pub async fn submit_utterance(
    state: &SharedState,
    capture_id: Uuid,
    transcript: String,
) -> Result<UtteranceResponse, ServiceError> {
    let (utterance, view) = {
        let mut capture = state.capture().lock().await;
        let utterance = capture.finish(capture_id, transcript)?;
        (utterance, CaptureView::from(capture.phase()))
    };
    sse_events::broadcast_capture(state, &view);

    match state.state_machine_phase().await {
        GamePhase::Idle => {
            let session = setup_from_transcript(state, &utterance.transcript).await?;
            Ok(UtteranceResponse::Setup { session })
        }
        GamePhase::Round(_) => {
            let result = process_transcript(state, &utterance.transcript).await?;
            Ok(UtteranceResponse::Scores { result })
        }
        GamePhase::Complete => Err(ServiceError::InvalidState(
            "the game is complete and waiting to be saved".into(),
        )),
    }
}

/// Announcer welcome for the running game's players.
pub async fn welcome(state: &SharedState) -> Result<WelcomeResponse, ServiceError> {
    let players = session_service::roster(state).await?;
    let facts = state.reconciler().player_facts().await;
    let message = state.parser().welcome_message(&players, &facts).await;
    Ok(WelcomeResponse { message })
}
