use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    config::ModelSettings,
    dto::settings::{ModelSettingsRequest, ModelTestRequest, ModelTestResponse},
    error::{AppError, ErrorBody},
    routes::extract::JsonBody,
    services::settings_service,
    state::SharedState,
};

/// Endpoints selecting the completion models.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session/settings", get(get_settings).put(update_settings))
        .route("/session/settings/test", post(test_model))
}

/// Models used for parsing and welcome messages.
#[utoipa::path(
    get,
    path = "/session/settings",
    tag = "settings",
    responses((status = 200, description = "Current model settings", body = ModelSettings))
)]
pub async fn get_settings(State(state): State<SharedState>) -> Json<ModelSettings> {
    Json(settings_service::current(&state).await)
}

/// Switch models for every later request.
#[utoipa::path(
    put,
    path = "/session/settings",
    tag = "settings",
    request_body = ModelSettingsRequest,
    responses(
        (status = 200, description = "Settings applied", body = ModelSettings),
        (status = 400, description = "Blank or oversized model name", body = ErrorBody)
    )
)]
pub async fn update_settings(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<ModelSettingsRequest>,
) -> Result<Json<ModelSettings>, AppError> {
    payload.validate()?;
    Ok(Json(
        settings_service::update(&state, payload.into()).await,
    ))
}

/// Try the selected model on a sample input.
#[utoipa::path(
    post,
    path = "/session/settings/test",
    tag = "settings",
    request_body = ModelTestRequest,
    responses(
        (status = 200, description = "Model reply", body = ModelTestResponse),
        (status = 400, description = "Missing transcript or invalid roster", body = ErrorBody),
        (status = 502, description = "Completion API failure", body = ErrorBody)
    )
)]
pub async fn test_model(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<ModelTestRequest>,
) -> Result<Json<ModelTestResponse>, AppError> {
    payload.validate()?;
    Ok(Json(settings_service::test_model(&state, payload).await?))
}
