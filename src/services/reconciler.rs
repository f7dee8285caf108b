//! Remote-first persistence with a local fallback.
//!
//! Writes go to the game store first. When the store fails while the process
//! believes it is offline the write lands in the local cache instead; when it
//! fails while online the failure is returned to the caller. Nothing written
//! offline is replayed: the next successful refresh treats the store as
//! authoritative and the cache is left as it was.

use std::{future::Future, sync::Arc, time::Duration};

use indexmap::IndexMap;
use serde::Serialize;
use tokio::{
    sync::{RwLock, watch},
    time::timeout,
};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::{
    config::ModelSettings,
    dao::{
        game_store::GameStore,
        local_cache::{CacheKey, LocalCache},
        models::{
            CurrentGameEntity, GameRecord, NewGameRecord, NewPlayerFact, PlayerFact, RecordIds,
            sort_by_date_desc,
        },
        storage::{StorageError, StorageResult},
    },
    error::ServiceError,
};

/// Default limit applied to every call to the store.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether the store answered the last check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// The last check succeeded.
    Connected,
    /// The last check failed; writes fall back to the local cache.
    Disconnected,
}

/// Owner of the in-memory game and fact views and of the write policy.
pub struct Reconciler {
    store: Arc<dyn GameStore>,
    cache: Arc<LocalCache>,
    connectivity: watch::Sender<Connectivity>,
    games: RwLock<Vec<GameRecord>>,
    facts: RwLock<IndexMap<String, PlayerFact>>,
    ids: RecordIds,
    remote_timeout: Duration,
}

impl Reconciler {
    /// Reconciler starting `Disconnected` with empty views.
    pub fn new(store: Arc<dyn GameStore>, cache: Arc<LocalCache>, remote_timeout: Duration) -> Self {
        let (connectivity, _rx) = watch::channel(Connectivity::Disconnected);
        Self {
            store,
            cache,
            connectivity,
            games: RwLock::new(Vec::new()),
            facts: RwLock::new(IndexMap::new()),
            ids: RecordIds::new(),
            remote_timeout,
        }
    }

    /// Last known connectivity.
    pub fn connectivity(&self) -> Connectivity {
        *self.connectivity.borrow()
    }

    /// Subscribe to connectivity changes.
    pub fn connectivity_watcher(&self) -> watch::Receiver<Connectivity> {
        self.connectivity.subscribe()
    }

    fn set_connectivity(&self, next: Connectivity) {
        let changed = self.connectivity.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            match next {
                Connectivity::Connected => info!("game store reachable; writes go remote"),
                Connectivity::Disconnected => {
                    warn!("game store unreachable; writes fall back to the local cache")
                }
            }
        }
    }

    async fn remote<T, F>(&self, operation: &'static str, call: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        match timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, limit = ?self.remote_timeout, "game store call timed out");
                Err(StorageError::Timeout(self.remote_timeout))
            }
        }
    }

    /// Check the store once and record the outcome.
    pub async fn check_connectivity(&self) -> Connectivity {
        let next = match self.remote("health check", self.store.health_check()).await {
            Ok(()) => Connectivity::Connected,
            Err(err) => {
                debug!(error = %err, "game store check failed");
                Connectivity::Disconnected
            }
        };
        self.set_connectivity(next);
        next
    }

    /// Check, then reload the views from the store when reachable or from the
    /// local cache otherwise.
    pub async fn refresh(&self) -> Connectivity {
        if self.check_connectivity().await == Connectivity::Connected {
            match self.fetch_remote().await {
                Ok(()) => return Connectivity::Connected,
                Err(err) => {
                    warn!(error = %err, "failed to fetch from game store after a successful check");
                    self.set_connectivity(Connectivity::Disconnected);
                }
            }
        }
        if let Err(err) = self.load_cached().await {
            warn!(error = %err, "failed to load games and facts from the local cache");
        }
        Connectivity::Disconnected
    }

    async fn fetch_remote(&self) -> StorageResult<()> {
        let mut games = self.remote("list games", self.store.list_games()).await?;
        let facts = self
            .remote("list player facts", self.store.list_player_facts())
            .await?;
        sort_by_date_desc(&mut games);
        *self.games.write().await = games;
        *self.facts.write().await = index_facts(facts);
        Ok(())
    }

    async fn load_cached(&self) -> Result<(), ServiceError> {
        if let Some(mut games) = self.cache.load::<Vec<GameRecord>>(CacheKey::Games).await? {
            sort_by_date_desc(&mut games);
            *self.games.write().await = games;
        }
        if let Some(facts) = self
            .cache
            .load::<Vec<PlayerFact>>(CacheKey::PlayerFacts)
            .await?
        {
            *self.facts.write().await = index_facts(facts);
        }
        Ok(())
    }

    /// Games in the view, newest first.
    pub async fn games(&self) -> Vec<GameRecord> {
        let mut games = self.games.read().await.clone();
        sort_by_date_desc(&mut games);
        games
    }

    /// One game from the view, or from the store when it is not known locally.
    pub async fn find_game(&self, id: &str) -> Result<GameRecord, ServiceError> {
        if let Some(game) = self.games.read().await.iter().find(|g| g.id == id) {
            return Ok(game.clone());
        }
        if self.connectivity() == Connectivity::Disconnected {
            return Err(ServiceError::Degraded);
        }
        self.remote("find game", self.store.find_game(id.to_string()))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("game `{id}`")))
    }

    /// Player facts, newest first.
    pub async fn player_facts(&self) -> Vec<PlayerFact> {
        let mut facts = self
            .facts
            .read()
            .await
            .values()
            .cloned()
            .collect::<Vec<_>>();
        facts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        facts
    }

    /// Persist a finished game.
    pub async fn save_game(&self, game: NewGameRecord) -> Result<GameRecord, ServiceError> {
        match self.remote("save game", self.store.save_game(game.clone())).await {
            Ok(record) => {
                self.games.write().await.push(record.clone());
                Ok(record)
            }
            Err(err) if self.connectivity() == Connectivity::Disconnected => {
                debug!(error = %err, "saving game to the local cache");
                let record = NewGameRecord {
                    id: None,
                    date: None,
                    ..game
                }
                .into_record(&self.ids);
                let mut games = self.games.write().await;
                let mut next = games.clone();
                next.push(record.clone());
                self.cache.store(CacheKey::Games, &next).await?;
                *games = next;
                info!(id = %record.id, "game saved locally while offline");
                Ok(record)
            }
            Err(err) => {
                warn!(error = %err, "failed to save game while connected");
                Err(err.into())
            }
        }
    }

    /// Insert or replace the fact for a player.
    pub async fn save_player_fact(&self, fact: NewPlayerFact) -> Result<PlayerFact, ServiceError> {
        match self
            .remote("save player fact", self.store.save_player_fact(fact.clone()))
            .await
        {
            Ok(saved) => {
                self.facts
                    .write()
                    .await
                    .insert(saved.player_name.clone(), saved.clone());
                Ok(saved)
            }
            Err(err) if self.connectivity() == Connectivity::Disconnected => {
                debug!(error = %err, "saving player fact to the local cache");
                let saved = fact.with_id(None);
                let mut facts = self.facts.write().await;
                let mut next = facts.clone();
                next.insert(saved.player_name.clone(), saved.clone());
                self.store_cached_facts(&next).await?;
                *facts = next;
                Ok(saved)
            }
            Err(err) => {
                warn!(error = %err, "failed to save player fact while connected");
                Err(err.into())
            }
        }
    }

    /// Remove the fact for a player.
    pub async fn delete_player_fact(&self, player_name: &str) -> Result<(), ServiceError> {
        let not_found = || ServiceError::NotFound(format!("no fact for player `{player_name}`"));
        match self
            .remote(
                "delete player fact",
                self.store.delete_player_fact(player_name.to_string()),
            )
            .await
        {
            Ok(existed) => {
                self.facts.write().await.shift_remove(player_name);
                if existed { Ok(()) } else { Err(not_found()) }
            }
            Err(err) if self.connectivity() == Connectivity::Disconnected => {
                debug!(error = %err, "deleting player fact in the local cache");
                let mut facts = self.facts.write().await;
                let mut next = facts.clone();
                if next.shift_remove(player_name).is_none() {
                    return Err(not_found());
                }
                self.store_cached_facts(&next).await?;
                *facts = next;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to delete player fact while connected");
                Err(err.into())
            }
        }
    }

    /// Write `facts` under the `playerFacts` key.
    async fn store_cached_facts(
        &self,
        facts: &IndexMap<String, PlayerFact>,
    ) -> Result<(), ServiceError> {
        let snapshot = facts.values().cloned().collect::<Vec<_>>();
        Ok(self.cache.store(CacheKey::PlayerFacts, &snapshot).await?)
    }

    /// Keep the in-progress game across restarts.
    pub async fn save_current_game(&self, game: &CurrentGameEntity) -> Result<(), ServiceError> {
        self.cache
            .store(CacheKey::CurrentGame, game)
            .await
            .map_err(Into::into)
    }

    /// In-progress game left by a previous run, if any.
    pub async fn load_current_game(&self) -> Result<Option<CurrentGameEntity>, ServiceError> {
        self.cache
            .load(CacheKey::CurrentGame)
            .await
            .map_err(Into::into)
    }

    /// Keep the model selection across restarts.
    pub async fn save_model_settings(&self, settings: &ModelSettings) -> Result<(), ServiceError> {
        Ok(self.cache.store(CacheKey::ModelSettings, settings).await?)
    }

    /// Model selection saved by a previous run, if any.
    pub async fn load_model_settings(&self) -> Result<Option<ModelSettings>, ServiceError> {
        Ok(self.cache.load(CacheKey::ModelSettings).await?)
    }

    /// Forget the in-progress game.
    pub async fn clear_current_game(&self) -> Result<(), ServiceError> {
        self.cache
            .remove(CacheKey::CurrentGame)
            .await
            .map_err(Into::into)
    }
}

fn index_facts(facts: Vec<PlayerFact>) -> IndexMap<String, PlayerFact> {
    facts
        .into_iter()
        .map(|fact| (fact.player_name.clone(), fact))
        .collect()
}
