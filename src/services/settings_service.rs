//! Model selection changed at runtime, and one-off model tests.

use tracing::{info, warn};

use crate::{
    config::ModelSettings,
    dto::settings::{ModelTask, ModelTestRequest, ModelTestResponse},
    error::ServiceError,
    services::transcript_parser::ParserError,
    state::{SharedState, adapter::ParseResult, grid::Roster},
};

/// Models in use right now.
pub async fn current(state: &SharedState) -> ModelSettings {
    state.parser().settings().await
}

/// Switch models for every later request and keep the choice in the cache.
/// A failed cache write only costs the choice at the next restart.
pub async fn update(state: &SharedState, settings: ModelSettings) -> ModelSettings {
    state.parser().set_settings(settings.clone()).await;
    if let Err(err) = state.reconciler().save_model_settings(&settings).await {
        warn!(error = %err, "model settings apply until restart only");
    }
    settings
}

/// Put back the models chosen by a previous run, if any.
pub async fn restore(state: &SharedState) {
    match state.reconciler().load_model_settings().await {
        Ok(Some(settings)) => {
            info!(
                score_parsing = %settings.models.score_parsing,
                "restored model settings from the cache"
            );
            state.parser().set_settings(settings).await;
        }
        Ok(None) => {}
        Err(err) => warn!(error = %err, "failed to read cached model settings"),
    }
}

/// Run one request against the selected model. The running game and the
/// stored history are left alone.
pub async fn test_model(
    state: &SharedState,
    request: ModelTestRequest,
) -> Result<ModelTestResponse, ServiceError> {
    let parser = state.parser();
    match request.task {
        ModelTask::Welcome => {
            let roster = Roster::new(&request.players)?;
            let facts = state.reconciler().player_facts().await;
            let message = parser.welcome_message(roster.names(), &facts).await;
            Ok(ModelTestResponse::Welcome { message })
        }
        ModelTask::Setup => {
            let transcript = required_transcript(&request)?;
            match parser.parse_setup(transcript).await {
                Ok(players) => Ok(ModelTestResponse::Setup { players }),
                Err(ParserError::Malformed(reason)) => Err(ServiceError::InvalidInput(format!(
                    "could not find 2 to 6 player names: {reason}"
                ))),
                Err(ParserError::Completion(err)) => Err(ServiceError::Parser(err.to_string())),
            }
        }
        ModelTask::Score => {
            let transcript = required_transcript(&request)?;
            let roster = Roster::new(&request.players)?;
            let result = match parser.parse_scores(transcript, roster.names()).await {
                Ok(result) => result,
                Err(ParserError::Malformed(reason)) => {
                    warn!(%reason, "test score reply could not be decoded");
                    ParseResult::default()
                }
                Err(ParserError::Completion(err)) => {
                    return Err(ServiceError::Parser(err.to_string()));
                }
            };
            Ok(result.into())
        }
    }
}

fn required_transcript(request: &ModelTestRequest) -> Result<&str, ServiceError> {
    request
        .transcript
        .as_deref()
        .map(str::trim)
        .filter(|transcript| !transcript.is_empty())
        .ok_or_else(|| ServiceError::InvalidInput("a transcript is required".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{MessageTone, ModelSelection, WelcomeSettings},
        dto::settings::ParsedScoreView,
        services::{session_service, voice_service},
        state::state_machine::GamePhase,
        test_support::{test_state, test_state_with},
    };

    fn custom_settings() -> ModelSettings {
        ModelSettings {
            models: ModelSelection {
                score_parsing: "openai/gpt-4o-mini".into(),
                setup_parsing: "mistralai/mistral-small".into(),
                welcome_message: "anthropic/claude-3-haiku".into(),
            },
            welcome_settings: WelcomeSettings {
                tone: MessageTone::Dramatic,
                ..WelcomeSettings::default()
            },
        }
    }

    #[tokio::test]
    async fn changed_models_are_used_by_later_transcripts() {
        let (state, harness) = test_state();
        update(&state, custom_settings()).await;
        assert_eq!(current(&state).await, custom_settings());

        harness
            .completion
            .push_reply(r#"{"players": ["Tanner", "Danni"]}"#);
        voice_service::setup_from_transcript(&state, "Tanner and Danni")
            .await
            .unwrap();
        harness
            .completion
            .push_reply(r#"{"round": 1, "scores": [{"playerIndex": 0, "score": 3}]}"#);
        voice_service::process_transcript(&state, "Tanner three")
            .await
            .unwrap();

        let models: Vec<String> = harness
            .completion
            .requests()
            .into_iter()
            .map(|request| request.model)
            .collect();
        assert_eq!(models, vec!["mistralai/mistral-small", "openai/gpt-4o-mini"]);
    }

    #[tokio::test]
    async fn saved_settings_come_back_after_a_restart() {
        let (state, harness) = test_state();
        update(&state, custom_settings()).await;

        let (restarted, completion) = test_state_with(harness.reconciler.clone());
        assert_ne!(current(&restarted).await, custom_settings());
        restore(&restarted).await;
        assert_eq!(current(&restarted).await, custom_settings());

        session_service::start_game(&restarted, vec!["Emma".into(), "David".into()])
            .await
            .unwrap();
        completion.push_reply("Welcome, golfers.");
        voice_service::welcome(&restarted).await.unwrap();
        assert_eq!(completion.requests()[0].model, "anthropic/claude-3-haiku");
    }

    #[tokio::test]
    async fn model_test_leaves_the_session_alone() {
        let (state, harness) = test_state();
        harness
            .completion
            .push_reply(r#"{"round": null, "scores": [{"playerIndex": 1, "score": -4}]}"#);

        let response = test_model(
            &state,
            ModelTestRequest {
                task: ModelTask::Score,
                transcript: Some("David minus four".into()),
                players: vec!["Emma".into(), "David".into()],
            },
        )
        .await
        .unwrap();

        assert_eq!(
            response,
            ModelTestResponse::Score {
                round: None,
                scores: vec![ParsedScoreView {
                    player_index: 1,
                    score: -4
                }],
            }
        );
        assert_eq!(state.state_machine_phase().await, GamePhase::Idle);
        assert!(harness.reconciler.games().await.is_empty());
    }

    #[tokio::test]
    async fn model_test_needs_its_inputs() {
        let (state, harness) = test_state();

        let missing_transcript = test_model(
            &state,
            ModelTestRequest {
                task: ModelTask::Setup,
                transcript: Some("  ".into()),
                players: Vec::new(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(missing_transcript, ServiceError::InvalidInput(_)));

        let short_roster = test_model(
            &state,
            ModelTestRequest {
                task: ModelTask::Welcome,
                transcript: None,
                players: vec!["Emma".into()],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(short_roster, ServiceError::InvalidInput(_)));
        assert!(harness.completion.requests().is_empty());
    }
}
