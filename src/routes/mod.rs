use axum::Router;

use crate::state::SharedState;

/// `/api` storage surface.
pub mod api;
/// Swagger UI and the OpenAPI document.
pub mod docs;
/// Extractors answering with JSON errors.
pub mod extract;
/// Health check.
pub mod health;
/// Recorded games and player facts.
pub mod history;
/// Running game.
pub mod session;
/// Completion model selection.
pub mod settings;
/// Server-sent events.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(api::router())
        .merge(session::router())
        .merge(settings::router())
        .merge(history::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
