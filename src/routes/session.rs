use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use validator::Validate;

use crate::{
    dao::models::GameRecord,
    dto::session::{
        CaptureView, ParsedScoresRequest, ScoreRequest, ScoreUpdateResponse, SessionView,
        StandingView, StartGameRequest, TranscriptRequest, UtteranceRequest, UtteranceResponse,
        WelcomeResponse,
    },
    error::{AppError, ErrorBody},
    routes::extract::{JsonBody, PathParams},
    services::{session_service, voice_service},
    state::SharedState,
};

/// Endpoints driving the running game.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/session/start", post(start_game))
        .route("/session/setup", post(setup_game))
        .route(
            "/session/rounds/{round}/players/{index}",
            put(set_score),
        )
        .route("/session/scores", post(apply_scores))
        .route("/session/transcript", post(process_transcript))
        .route("/session/capture/start", post(start_capture))
        .route("/session/capture/utterance", post(submit_utterance))
        .route("/session/capture/cancel", post(cancel_capture))
        .route("/session/leaderboard", get(leaderboard))
        .route("/session/finish", post(finish_game))
        .route("/session/reset", post(reset_game))
        .route("/session/welcome", post(welcome))
}

/// Snapshot of the running game.
#[utoipa::path(
    get,
    path = "/session",
    tag = "session",
    responses((status = 200, description = "Current session", body = SessionView))
)]
pub async fn get_session(State(state): State<SharedState>) -> Json<SessionView> {
    Json(session_service::session_view(&state).await)
}

/// Start a game with the given roster.
#[utoipa::path(
    post,
    path = "/session/start",
    tag = "session",
    request_body = StartGameRequest,
    responses(
        (status = 200, description = "Game started", body = SessionView),
        (status = 400, description = "Invalid roster", body = ErrorBody),
        (status = 409, description = "A game is already running", body = ErrorBody)
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<StartGameRequest>,
) -> Result<Json<SessionView>, AppError> {
    payload.validate()?;
    Ok(Json(
        session_service::start_game(&state, payload.players).await?,
    ))
}

/// Start a game with the roster announced in a transcript.
#[utoipa::path(
    post,
    path = "/session/setup",
    tag = "session",
    request_body = TranscriptRequest,
    responses(
        (status = 200, description = "Game started", body = SessionView),
        (status = 400, description = "No usable roster in the transcript", body = ErrorBody),
        (status = 502, description = "Completion API failed", body = ErrorBody)
    )
)]
pub async fn setup_game(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<TranscriptRequest>,
) -> Result<Json<SessionView>, AppError> {
    payload.validate()?;
    Ok(Json(
        voice_service::setup_from_transcript(&state, &payload.transcript).await?,
    ))
}

/// Overwrite one cell of the grid.
#[utoipa::path(
    put,
    path = "/session/rounds/{round}/players/{index}",
    tag = "session",
    params(
        ("round" = u8, Path, description = "Round number, 1 to 9"),
        ("index" = usize, Path, description = "Player position in the roster")
    ),
    request_body = ScoreRequest,
    responses(
        (status = 200, description = "Score recorded", body = ScoreUpdateResponse),
        (status = 400, description = "Cell or score out of range", body = ErrorBody),
        (status = 409, description = "No game open for edits", body = ErrorBody)
    )
)]
pub async fn set_score(
    State(state): State<SharedState>,
    PathParams((round, index)): PathParams<(u8, usize)>,
    JsonBody(payload): JsonBody<ScoreRequest>,
) -> Result<Json<ScoreUpdateResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        session_service::set_score(&state, round, index, payload.score).await?,
    ))
}

/// Apply an already parsed score announcement.
#[utoipa::path(
    post,
    path = "/session/scores",
    tag = "session",
    request_body = ParsedScoresRequest,
    responses(
        (status = 200, description = "Scores applied or none detected", body = ScoreUpdateResponse),
        (status = 409, description = "No game open for edits", body = ErrorBody)
    )
)]
pub async fn apply_scores(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<ParsedScoresRequest>,
) -> Result<Json<ScoreUpdateResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        session_service::apply_scores(&state, payload.into()).await?,
    ))
}

/// Parse a transcript for scores and apply them.
#[utoipa::path(
    post,
    path = "/session/transcript",
    tag = "session",
    request_body = TranscriptRequest,
    responses(
        (status = 200, description = "Scores applied or none detected", body = ScoreUpdateResponse),
        (status = 409, description = "No game open for edits", body = ErrorBody),
        (status = 502, description = "Completion API failed", body = ErrorBody)
    )
)]
pub async fn process_transcript(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<TranscriptRequest>,
) -> Result<Json<ScoreUpdateResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        voice_service::process_transcript(&state, &payload.transcript).await?,
    ))
}

/// Open a listening session.
#[utoipa::path(
    post,
    path = "/session/capture/start",
    tag = "voice",
    responses(
        (status = 200, description = "Listening", body = CaptureView),
        (status = 409, description = "Already listening", body = ErrorBody)
    )
)]
pub async fn start_capture(
    State(state): State<SharedState>,
) -> Result<Json<CaptureView>, AppError> {
    Ok(Json(voice_service::start_capture(&state).await?))
}

/// Close the listening session with its transcript.
#[utoipa::path(
    post,
    path = "/session/capture/utterance",
    tag = "voice",
    request_body = UtteranceRequest,
    responses(
        (status = 200, description = "Utterance processed", body = UtteranceResponse),
        (status = 409, description = "Not listening or another session is open", body = ErrorBody),
        (status = 502, description = "Completion API failed", body = ErrorBody)
    )
)]
pub async fn submit_utterance(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<UtteranceRequest>,
) -> Result<Json<UtteranceResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        voice_service::submit_utterance(&state, payload.capture_id, payload.transcript).await?,
    ))
}

/// Drop the listening session.
#[utoipa::path(
    post,
    path = "/session/capture/cancel",
    tag = "voice",
    responses(
        (status = 200, description = "Idle", body = CaptureView),
        (status = 409, description = "Not listening", body = ErrorBody)
    )
)]
pub async fn cancel_capture(
    State(state): State<SharedState>,
) -> Result<Json<CaptureView>, AppError> {
    Ok(Json(voice_service::cancel_capture(&state).await?))
}

/// Standings of the running game.
#[utoipa::path(
    get,
    path = "/session/leaderboard",
    tag = "session",
    responses(
        (status = 200, description = "Lowest total first", body = [StandingView]),
        (status = 409, description = "No game is running", body = ErrorBody)
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<Vec<StandingView>>, AppError> {
    Ok(Json(session_service::leaderboard(&state).await?))
}

/// Retry saving a complete game.
#[utoipa::path(
    post,
    path = "/session/finish",
    tag = "session",
    responses(
        (status = 200, description = "Game saved", body = GameRecord),
        (status = 409, description = "No complete game", body = ErrorBody),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn finish_game(State(state): State<SharedState>) -> Result<Json<GameRecord>, AppError> {
    Ok(Json(session_service::finish_game(&state).await?))
}

/// Abandon the running game and reload history.
#[utoipa::path(
    post,
    path = "/session/reset",
    tag = "session",
    responses(
        (status = 200, description = "Idle session", body = SessionView),
        (status = 409, description = "A complete game must be saved first", body = ErrorBody)
    )
)]
pub async fn reset_game(State(state): State<SharedState>) -> Result<Json<SessionView>, AppError> {
    Ok(Json(session_service::reset_game(&state).await?))
}

/// Announcer welcome for the running game.
#[utoipa::path(
    post,
    path = "/session/welcome",
    tag = "voice",
    responses(
        (status = 200, description = "Welcome message", body = WelcomeResponse),
        (status = 409, description = "No game is running", body = ErrorBody)
    )
)]
pub async fn welcome(State(state): State<SharedState>) -> Result<Json<WelcomeResponse>, AppError> {
    Ok(Json(voice_service::welcome(&state).await?))
}
