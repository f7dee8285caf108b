use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};

use crate::dao::{
    game_store::GameStore,
    models::{GameRecord, NewGameRecord, NewPlayerFact, PlayerFact},
    storage::StorageResult,
};

use super::{
    config::HttpStoreConfig,
    error::{HttpDaoError, HttpResult},
};

const GAMES: &[&str] = &["api", "games"];
const PLAYER_FACTS: &[&str] = &["api", "player-facts"];

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Store backed by another scorekeeper instance's REST API.
#[derive(Clone)]
pub struct HttpGameStore {
    client: Client,
    base_url: Arc<Url>,
    bearer_token: Option<Arc<str>>,
}

impl HttpGameStore {
    /// Build a client for the configured API. No request is sent here.
    pub fn new(config: HttpStoreConfig) -> HttpResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| HttpDaoError::ClientBuilder { source })?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|err| {
            HttpDaoError::InvalidUrl {
                url: config.base_url.clone(),
                reason: err.to_string(),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(HttpDaoError::InvalidUrl {
                url: config.base_url,
                reason: "URL cannot be a base".to_string(),
            });
        }

        Ok(Self {
            client,
            base_url: Arc::new(base_url),
            bearer_token: config.bearer_token.map(Arc::from),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = (*self.base_url).clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.client.request(method, self.url(segments));
        match self.bearer_token {
            Some(ref token) => builder.bearer_auth(token.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> HttpResult<Response> {
        builder
            .send()
            .await
            .map_err(|source| HttpDaoError::RequestSend {
                path: path.to_string(),
                source,
            })
    }

    async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> HttpResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|source| HttpDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    async fn status_error(response: Response, path: &str) -> HttpDaoError {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        HttpDaoError::RequestStatus {
            path: path.to_string(),
            status,
            message,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> HttpResult<Option<T>> {
        let path = segments.join("/");
        let response = self
            .send(self.request(Method::GET, segments), &path)
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Self::decode(response, &path).await.map(Some),
            _ => Err(Self::status_error(response, &path).await),
        }
    }

    async fn list<T: DeserializeOwned>(&self, segments: &[&str]) -> HttpResult<Vec<T>> {
        let path = segments.join("/");
        let response = self
            .send(self.request(Method::GET, segments), &path)
            .await?;
        if response.status().is_success() {
            Self::decode(response, &path).await
        } else {
            Err(Self::status_error(response, &path).await)
        }
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> HttpResult<T>
    where
        B: ?Sized + serde::Serialize,
        T: DeserializeOwned,
    {
        let path = segments.join("/");
        let response = self
            .send(self.request(Method::POST, segments).json(body), &path)
            .await?;
        if response.status().is_success() {
            Self::decode(response, &path).await
        } else {
            Err(Self::status_error(response, &path).await)
        }
    }

    async fn delete(&self, segments: &[&str]) -> HttpResult<bool> {
        let path = segments.join("/");
        let response = self
            .send(self.request(Method::DELETE, segments), &path)
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(Self::status_error(response, &path).await),
        }
    }
}

fn with_segment<'a>(base: &[&'a str], last: &'a str) -> Vec<&'a str> {
    let mut segments = base.to_vec();
    segments.push(last);
    segments
}

impl GameStore for HttpGameStore {
    fn save_game(&self, game: NewGameRecord) -> BoxFuture<'static, StorageResult<GameRecord>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .post_json::<_, GameRecord>(GAMES, &game)
                .await
                .map_err(Into::into)
        })
    }

    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .get_json::<GameRecord>(&with_segment(GAMES, &id))
                .await
                .map_err(Into::into)
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.list::<GameRecord>(GAMES).await.map_err(Into::into) })
    }

    fn list_player_facts(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerFact>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list::<PlayerFact>(PLAYER_FACTS)
                .await
                .map_err(Into::into)
        })
    }

    fn save_player_fact(
        &self,
        fact: NewPlayerFact,
    ) -> BoxFuture<'static, StorageResult<PlayerFact>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .post_json::<_, PlayerFact>(PLAYER_FACTS, &fact)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_player_fact(&self, player_name: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete(&with_segment(PLAYER_FACTS, &player_name))
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list::<serde_json::Value>(PLAYER_FACTS)
                .await
                .map(|_| ())
                .map_err(Into::into)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::storage::StorageError;
    use axum::{
        Json, Router,
        extract::Path,
        http::StatusCode as AxumStatus,
        routing::{delete, get},
    };
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> HttpGameStore {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        HttpGameStore::new(HttpStoreConfig::new(format!("http://{addr}/"))).unwrap()
    }

    fn record(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "date": "2024-03-15",
            "playerNames": ["Emma", "David"],
            "scores": [[1, null]],
            "finalTotals": [1, 0]
        })
    }

    #[test]
    fn urls_escape_path_segments() {
        let store = HttpGameStore::new(HttpStoreConfig::new("http://remote:8080/base/")).unwrap();
        let url = store.url(&with_segment(PLAYER_FACTS, "Mary Ann/2"));
        assert_eq!(
            url.as_str(),
            "http://remote:8080/base/api/player-facts/Mary%20Ann%2F2"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(HttpGameStore::new(HttpStoreConfig::new("mailto:someone")).is_err());
    }

    #[tokio::test]
    async fn reads_games_and_maps_not_found() {
        let router = Router::new()
            .route("/api/games", get(|| async { Json(json!([record("2")])) }))
            .route(
                "/api/games/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "2" {
                        Ok(Json(record("2")))
                    } else {
                        Err(AxumStatus::NOT_FOUND)
                    }
                }),
            );
        let store = serve(router).await;

        let games = store.list_games().await.unwrap();
        assert_eq!(games[0].scores[0], vec![Some(1), None]);
        assert!(store.find_game("2".into()).await.unwrap().is_some());
        assert!(store.find_game("9".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn error_body_is_surfaced_and_classified() {
        let router = Router::new()
            .route(
                "/api/games",
                axum::routing::post(|| async {
                    (
                        AxumStatus::BAD_REQUEST,
                        Json(json!({ "error": "players must not be empty" })),
                    )
                }),
            )
            .route(
                "/api/player-facts",
                get(|| async { AxumStatus::INTERNAL_SERVER_ERROR }),
            );
        let store = serve(router).await;

        let err = store
            .save_game(NewGameRecord {
                id: None,
                date: None,
                player_names: vec![],
                scores: vec![],
                final_totals: vec![],
            })
            .await
            .unwrap_err();
        match err {
            StorageError::Rejected { message } => {
                assert!(message.contains("players must not be empty"))
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        let err = store.health_check().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn delete_reports_missing_facts() {
        let router = Router::new().route(
            "/api/player-facts/{name}",
            delete(|Path(name): Path<String>| async move {
                if name == "Emma" {
                    AxumStatus::NO_CONTENT
                } else {
                    AxumStatus::NOT_FOUND
                }
            }),
        );
        let store = serve(router).await;

        assert!(store.delete_player_fact("Emma".into()).await.unwrap());
        assert!(!store.delete_player_fact("Zoe".into()).await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_remote_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let store = HttpGameStore::new(HttpStoreConfig::new(format!("http://{addr}"))).unwrap();
        let err = store.list_player_facts().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }
}
