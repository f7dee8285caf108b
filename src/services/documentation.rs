use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Play Nine scorekeeper.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::event_stream,
        crate::routes::api::list_games,
        crate::routes::api::get_game,
        crate::routes::api::create_game,
        crate::routes::api::list_facts,
        crate::routes::api::upsert_fact,
        crate::routes::api::delete_fact,
        crate::routes::session::get_session,
        crate::routes::session::start_game,
        crate::routes::session::setup_game,
        crate::routes::session::set_score,
        crate::routes::session::apply_scores,
        crate::routes::session::process_transcript,
        crate::routes::session::start_capture,
        crate::routes::session::submit_utterance,
        crate::routes::session::cancel_capture,
        crate::routes::session::leaderboard,
        crate::routes::session::finish_game,
        crate::routes::session::reset_game,
        crate::routes::session::welcome,
        crate::routes::history::list_games,
        crate::routes::history::search_games,
        crate::routes::history::best_games,
        crate::routes::history::get_game,
        crate::routes::history::list_facts,
        crate::routes::history::save_fact,
        crate::routes::history::delete_fact,
        crate::routes::settings::get_settings,
        crate::routes::settings::update_settings,
        crate::routes::settings::test_model,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::PhaseChangedEvent,
            crate::dto::sse::ConnectivityEvent,
            crate::dto::session::SessionView,
            crate::dto::session::SaveOutcome,
            crate::dto::history::GameSummary,
            crate::config::ModelSettings,
            crate::config::ModelSelection,
            crate::config::WelcomeSettings,
            crate::config::MessageLength,
            crate::config::MessageTone,
            crate::dto::settings::ModelSettingsRequest,
            crate::dto::settings::ModelTask,
            crate::dto::settings::ModelTestRequest,
            crate::dto::settings::ParsedScoreView,
            crate::dto::settings::ModelTestResponse,
            crate::error::ErrorBody,
            crate::dao::models::GameRecord,
            crate::dao::models::NewGameRecord,
            crate::dao::models::PlayerFact,
            crate::dao::models::NewPlayerFact,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "api", description = "Game and player fact storage"),
        (name = "session", description = "Scoring the running game"),
        (name = "voice", description = "Voice capture and transcript parsing"),
        (name = "history", description = "Recorded games and player facts"),
        (name = "settings", description = "Completion model selection"),
    )
)]
/// OpenAPI document of every route.
pub struct ApiDoc;
