//! In-memory doubles shared by the unit tests.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use futures::future::BoxFuture;
use tempfile::TempDir;

use crate::{
    config::AppConfig,
    dao::{
        game_store::GameStore,
        local_cache::LocalCache,
        models::{GameRecord, NewGameRecord, NewPlayerFact, PlayerFact},
        storage::{StorageError, StorageResult},
    },
    services::{
        completion::{CompletionClient, CompletionError, CompletionRequest},
        reconciler::Reconciler,
        transcript_parser::TranscriptParser,
    },
    state::{AppState, SharedState},
};

const TEST_REMOTE_TIMEOUT: Duration = Duration::from_secs(2);

/// Collaborators behind a state built by [`test_state`].
pub struct TestHarness {
    pub store: Arc<FakeStore>,
    pub completion: Arc<FakeCompletion>,
    pub reconciler: Arc<Reconciler>,
    _cache_dir: TempDir,
}

/// Fresh state over an online [`FakeStore`] and an empty cache directory.
pub fn test_state() -> (SharedState, TestHarness) {
    let store = FakeStore::shared();
    let cache_dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(LocalCache::new(cache_dir.path().join("cache.json")));
    let reconciler = Arc::new(Reconciler::new(store.clone(), cache, TEST_REMOTE_TIMEOUT));
    let completion = Arc::new(FakeCompletion::default());
    let state = AppState::new(store.clone(), reconciler.clone(), parser(completion.clone()));
    (
        state,
        TestHarness {
            store,
            completion,
            reconciler,
            _cache_dir: cache_dir,
        },
    )
}

/// Fresh state sharing an existing reconciler, as a restarted server would.
pub fn test_state_with(reconciler: Arc<Reconciler>) -> (SharedState, Arc<FakeCompletion>) {
    let completion = Arc::new(FakeCompletion::default());
    let state = AppState::new(
        FakeStore::shared(),
        reconciler,
        parser(completion.clone()),
    );
    (state, completion)
}

fn parser(completion: Arc<FakeCompletion>) -> TranscriptParser {
    TranscriptParser::new(completion, AppConfig::default().llm.model_settings())
}

#[derive(Default)]
struct FakeInner {
    games: Vec<GameRecord>,
    facts: Vec<PlayerFact>,
    offline: bool,
    failing_writes: bool,
    hanging: bool,
    next_id: u64,
}

/// Game store double with switchable failure modes.
#[derive(Default)]
pub struct FakeStore {
    inner: Mutex<FakeInner>,
}

impl FakeStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, FakeInner> {
        self.inner.lock().unwrap()
    }

    pub fn set_online(&self, online: bool) {
        self.lock().offline = !online;
    }

    pub fn set_failing_writes(&self, failing: bool) {
        self.lock().failing_writes = failing;
    }

    pub fn set_hanging(&self, hanging: bool) {
        self.lock().hanging = hanging;
    }

    pub fn games(&self) -> Vec<GameRecord> {
        self.lock().games.clone()
    }

    pub fn facts(&self) -> Vec<PlayerFact> {
        self.lock().facts.clone()
    }

    pub fn insert_game(&self, record: GameRecord) {
        self.lock().games.push(record);
    }

    fn respond<T, F>(&self, write: bool, op: F) -> BoxFuture<'static, StorageResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut FakeInner) -> StorageResult<T>,
    {
        let mut inner = self.lock();
        if inner.hanging {
            return Box::pin(futures::future::pending());
        }
        let result = if inner.offline {
            Err(StorageError::unavailable(
                "connection refused".into(),
                io::Error::from(io::ErrorKind::ConnectionRefused),
            ))
        } else if write && inner.failing_writes {
            Err(StorageError::unavailable(
                "write failed".into(),
                io::Error::other("disk full"),
            ))
        } else {
            op(&mut inner)
        };
        Box::pin(async move { result })
    }
}

impl GameStore for FakeStore {
    fn save_game(&self, game: NewGameRecord) -> BoxFuture<'static, StorageResult<GameRecord>> {
        self.respond(true, move |inner| {
            inner.next_id += 1;
            let record = GameRecord {
                id: game
                    .id
                    .unwrap_or_else(|| format!("server-{}", inner.next_id)),
                date: game.date.unwrap_or_else(|| "2024-03-15".to_string()),
                player_names: game.player_names,
                scores: game.scores,
                final_totals: game.final_totals,
            };
            inner.games.push(record.clone());
            Ok(record)
        })
    }

    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        self.respond(false, move |inner| {
            Ok(inner.games.iter().find(|g| g.id == id).cloned())
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecord>>> {
        self.respond(false, |inner| Ok(inner.games.clone()))
    }

    fn list_player_facts(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerFact>>> {
        self.respond(false, |inner| Ok(inner.facts.clone()))
    }

    fn save_player_fact(
        &self,
        fact: NewPlayerFact,
    ) -> BoxFuture<'static, StorageResult<PlayerFact>> {
        self.respond(true, move |inner| {
            inner.next_id += 1;
            let saved = fact.with_id(Some(inner.next_id as i64));
            inner.facts.retain(|f| f.player_name != saved.player_name);
            inner.facts.push(saved.clone());
            Ok(saved)
        })
    }

    fn delete_player_fact(&self, player_name: String) -> BoxFuture<'static, StorageResult<bool>> {
        self.respond(true, move |inner| {
            let before = inner.facts.len();
            inner.facts.retain(|f| f.player_name != player_name);
            Ok(inner.facts.len() != before)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.respond(false, |_| Ok(()))
    }
}

/// Two-player game payload with every round scored.
pub fn game(id: Option<&str>) -> NewGameRecord {
    NewGameRecord {
        id: id.map(str::to_string),
        date: None,
        player_names: vec!["Emma".into(), "David".into()],
        scores: vec![vec![Some(2), Some(3)]; 9],
        final_totals: vec![18, 27],
    }
}

/// Stored game with the given identity.
pub fn sample_record(id: &str, date: &str) -> GameRecord {
    GameRecord {
        id: id.to_string(),
        date: date.to_string(),
        player_names: vec!["Emma".into(), "David".into()],
        scores: vec![vec![Some(2), Some(3)]; 9],
        final_totals: vec![18, 27],
    }
}

/// Completion client answering from a script and recording every request.
#[derive(Default)]
pub struct FakeCompletion {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeCompletion {
    pub fn with_replies(
        replies: impl IntoIterator<Item = Result<String, CompletionError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        })
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(reply.to_string()));
    }

    pub fn push_error(&self, err: CompletionError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl CompletionClient for FakeCompletion {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'static, Result<String, CompletionError>> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(CompletionError::EmptyReply));
        Box::pin(async move { reply })
    }
}
