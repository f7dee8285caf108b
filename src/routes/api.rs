use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};

use crate::{
    dao::models::{GameRecord, NewGameRecord, NewPlayerFact, PlayerFact},
    error::{AppError, ErrorBody},
    routes::extract::{JsonBody, PathParams},
    services::api_service,
    state::SharedState,
};

/// Storage endpoints consumed by remote clients of this process.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/games", get(list_games).post(create_game))
        .route("/api/games/{id}", get(get_game))
        .route("/api/player-facts", get(list_facts).post(upsert_fact))
        .route("/api/player-facts/{player_name}", delete(delete_fact))
}

/// List stored games, newest first.
#[utoipa::path(
    get,
    path = "/api/games",
    tag = "api",
    responses(
        (status = 200, description = "Stored games", body = [GameRecord]),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn list_games(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameRecord>>, AppError> {
    Ok(Json(api_service::list_games(&state).await?))
}

/// Retrieve one stored game.
#[utoipa::path(
    get,
    path = "/api/games/{id}",
    tag = "api",
    params(("id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game", body = GameRecord),
        (status = 404, description = "Unknown game", body = ErrorBody)
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    PathParams(id): PathParams<String>,
) -> Result<Json<GameRecord>, AppError> {
    Ok(Json(api_service::get_game(&state, id).await?))
}

/// Record a finished game.
#[utoipa::path(
    post,
    path = "/api/games",
    tag = "api",
    request_body = NewGameRecord,
    responses(
        (status = 201, description = "Game recorded", body = GameRecord),
        (status = 400, description = "Malformed game", body = ErrorBody),
        (status = 409, description = "Identifier already used", body = ErrorBody)
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<NewGameRecord>,
) -> Result<(StatusCode, Json<GameRecord>), AppError> {
    let created = api_service::create_game(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List player facts, newest first.
#[utoipa::path(
    get,
    path = "/api/player-facts",
    tag = "api",
    responses((status = 200, description = "Player facts", body = [PlayerFact]))
)]
pub async fn list_facts(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PlayerFact>>, AppError> {
    Ok(Json(api_service::list_facts(&state).await?))
}

/// Insert or replace the fact of a player.
#[utoipa::path(
    post,
    path = "/api/player-facts",
    tag = "api",
    request_body = NewPlayerFact,
    responses(
        (status = 201, description = "Fact stored", body = PlayerFact),
        (status = 400, description = "Malformed fact", body = ErrorBody)
    )
)]
pub async fn upsert_fact(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<NewPlayerFact>,
) -> Result<(StatusCode, Json<PlayerFact>), AppError> {
    let saved = api_service::upsert_fact(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Delete the fact of a player.
#[utoipa::path(
    delete,
    path = "/api/player-facts/{player_name}",
    tag = "api",
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
    api_service::delete_fact(&state, player_name).await?;
    Ok(StatusCode::NO_CONTENT)
}
