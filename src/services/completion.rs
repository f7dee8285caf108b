//! Chat-completion client used to turn transcripts into structured data.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmConfig;

const APP_TITLE: &str = "Play Nine Golf Card Game";

/// One completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Model identifier, e.g. `openai/gpt-4o-mini`.
    pub model: String,
    /// Instructions sent as the system message.
    pub system_prompt: String,
    /// Text sent as the user message.
    pub user_prompt: String,
    /// Ask the model for a JSON object reply.
    pub json_reply: bool,
}

/// Failures of the completion API.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// No API key in the configuration.
    #[error("completion API key is not configured")]
    MissingApiKey,
    /// The HTTP client could not be built.
    #[error("failed to build completion client")]
    ClientBuilder {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The request never got an answer.
    #[error("failed to reach completion API")]
    RequestSend {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Non-success status, with the response body.
    #[error("completion API answered {status}: {body}")]
    RequestStatus {
        /// Status returned.
        status: StatusCode,
        /// Response body, for the logs.
        body: String,
    },
    /// The response body was not the expected JSON.
    #[error("failed to decode completion API response")]
    DecodeResponse {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Reply without message content.
    #[error("completion API returned no message content")]
    EmptyReply,
}

/// Text-in, text-out completion backend.
pub trait CompletionClient: Send + Sync {
    /// Return the assistant message content for `request`.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'static, Result<String, CompletionError>>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    temperature: u8,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenRouter chat completions client.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    endpoint: Arc<str>,
    api_key: Option<Arc<str>>,
}

impl OpenRouterClient {
    /// Build a client from the completion settings.
    pub fn new(config: &LlmConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| CompletionError::ClientBuilder { source })?;
        if config.api_key.is_none() {
            warn!("no completion API key configured; transcript parsing is disabled");
        }
        Ok(Self {
            client,
            endpoint: Arc::from(config.endpoint.as_str()),
            api_key: config.api_key.as_deref().map(Arc::from),
        })
    }

    async fn send(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let api_key = self.api_key.clone().ok_or(CompletionError::MissingApiKey)?;
        let body = ChatRequest {
            model: &request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            response_format: request.json_reply.then_some(ResponseFormat {
                kind: "json_object",
            }),
            temperature: 0,
        };
        debug!(model = %request.model, "sending completion request");

        let response = self
            .client
            .post(self.endpoint.as_ref())
            .bearer_auth(api_key.as_ref())
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await
            .map_err(|source| CompletionError::RequestSend { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::RequestStatus { status, body });
        }

        let payload = response
            .json::<ChatResponse>()
            .await
            .map_err(|source| CompletionError::DecodeResponse { source })?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyReply)
    }
}

impl CompletionClient for OpenRouterClient {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'static, Result<String, CompletionError>> {
        let client = self.clone();
        Box::pin(async move { client.send(request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::{Json, Router, http::HeaderMap, routing::post};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/chat")
    }

    fn config(endpoint: String, api_key: Option<&str>) -> LlmConfig {
        let mut llm = AppConfig::default().llm;
        llm.endpoint = endpoint;
        llm.api_key = api_key.map(str::to_string);
        llm.timeout = Duration::from_secs(5);
        llm
    }

    fn request(json_reply: bool) -> CompletionRequest {
        CompletionRequest {
            model: "test/model".into(),
            system_prompt: "system".into(),
            user_prompt: "Ann five".into(),
            json_reply,
        }
    }

    #[tokio::test]
    async fn sends_openrouter_shaped_request() {
        let router = Router::new().route(
            "/chat",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(headers["x-title"], APP_TITLE);
                assert_eq!(body["model"], "test/model");
                assert_eq!(body["temperature"], 0);
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["content"], "Ann five");
                assert_eq!(body["response_format"]["type"], "json_object");
                Json(json!({ "choices": [{ "message": { "content": "  {\"scores\": []} " } }] }))
            }),
        );
        let client = OpenRouterClient::new(&config(serve(router).await, Some("sk-test"))).unwrap();

        let reply = client.complete(request(true)).await.unwrap();

        assert_eq!(reply, "{\"scores\": []}");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client =
            OpenRouterClient::new(&config("http://127.0.0.1:9/chat".into(), None)).unwrap();
        let err = client.complete(request(false)).await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingApiKey));
    }

    #[tokio::test]
    async fn error_status_and_empty_reply_are_errors() {
        let router = Router::new()
            .route(
                "/chat",
                post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
            )
            .route(
                "/empty",
                post(|| async { Json(json!({ "choices": [] })) }),
            );
        let endpoint = serve(router).await;
        let client = OpenRouterClient::new(&config(endpoint.clone(), Some("k"))).unwrap();
        let err = client.complete(request(false)).await.unwrap_err();
        assert!(matches!(
            err,
            CompletionError::RequestStatus { status, ref body }
                if status == StatusCode::TOO_MANY_REQUESTS && body == "slow down"
        ));

        let empty = OpenRouterClient::new(&config(endpoint.replace("/chat", "/empty"), Some("k")))
            .unwrap();
        assert!(matches!(
            empty.complete(request(false)).await.unwrap_err(),
            CompletionError::EmptyReply
        ));
    }
}
