use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use validator::Validate;

use crate::{
    dao::models::{GameRecord, PlayerFact},
    dto::{
        facts::FactRequest,
        history::{GameSummary, SearchQuery},
    },
    error::{AppError, ErrorBody},
    routes::extract::{JsonBody, PathParams, QueryParams},
    services::{facts_service, history_service},
    state::SharedState,
};

/// History and player facts as seen through the reconciler.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session/history", get(list_games))
        .route("/session/history/search", get(search_games))
        .route("/session/history/best", get(best_games))
        .route("/session/history/{id}", get(get_game))
        .route("/session/facts", get(list_facts).post(save_fact))
        .route("/session/facts/{player_name}", delete(delete_fact))
}

/// Recorded games, newest first.
#[utoipa::path(
    get,
    path = "/session/history",
    tag = "history",
    responses((status = 200, description = "Recorded games", body = [GameRecord]))
)]
pub async fn list_games(State(state): State<SharedState>) -> Json<Vec<GameRecord>> {
    Json(history_service::list_games(&state).await)
}

/// Summaries of the games played by the named players.
#[utoipa::path(
    get,
    path = "/session/history/search",
    tag = "history",
    params(SearchQuery),
    responses((status = 200, description = "Matching games", body = [GameSummary]))
)]
pub async fn search_games(
    State(state): State<SharedState>,
    QueryParams(query): QueryParams<SearchQuery>,
) -> Json<Vec<GameSummary>> {
    Json(history_service::search_games(&state, &query.fragments()).await)
}

/// The three games with the lowest winning total.
#[utoipa::path(
    get,
    path = "/session/history/best",
    tag = "history",
    responses((status = 200, description = "Best games", body = [GameRecord]))
)]
pub async fn best_games(State(state): State<SharedState>) -> Json<Vec<GameRecord>> {
    Json(history_service::best_games(&state).await)
}

/// One recorded game.
#[utoipa::path(
    get,
    path = "/session/history/{id}",
    tag = "history",
    params(("id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game", body = GameRecord),
        (status = 404, description = "Unknown game", body = ErrorBody),
        (status = 503, description = "Offline and not cached", body = ErrorBody)
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    PathParams(id): PathParams<String>,
) -> Result<Json<GameRecord>, AppError> {
    Ok(Json(history_service::find_game(&state, &id).await?))
}

/// Player facts, newest first.
#[utoipa::path(
    get,
    path = "/session/facts",
    tag = "history",
    responses((status = 200, description = "Player facts", body = [PlayerFact]))
)]
pub async fn list_facts(State(state): State<SharedState>) -> Json<Vec<PlayerFact>> {
    Json(facts_service::list_facts(&state).await)
}

/// Attach a fact to a player.
#[utoipa::path(
    post,
    path = "/session/facts",
    tag = "history",
    request_body = FactRequest,
    responses(
        (status = 201, description = "Fact stored", body = PlayerFact),
        (status = 400, description = "Blank name or fact", body = ErrorBody),
        (status = 503, description = "Store failed while online", body = ErrorBody)
    )
)]
pub async fn save_fact(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<FactRequest>,
) -> Result<(StatusCode, Json<PlayerFact>), AppError> {
    payload.validate()?;
    let saved = facts_service::save_fact(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Remove the fact of a player.
#[utoipa::path(
    delete,
    path = "/session/facts/{player_name}",
    tag = "history",
    params(("player_name" = String, Path, description = "Player whose fact is removed")),
    responses(
        (status = 204, description = "Fact deleted"),
        (status = 404, description = "No fact for that player", body = ErrorBody)
    )
)]
pub async fn delete_fact(
    State(state): State<SharedState>,
    PathParams(player_name): PathParams<String>,
) -> Result<StatusCode, AppError> {
    facts_service::delete_fact(&state, &player_name).await?;
    Ok(StatusCode::NO_CONTENT)
}
