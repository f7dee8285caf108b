/// Client of another instance's `/api` surface.
pub mod http;
/// Authoritative SQLite store.
pub mod sqlite;

use crate::dao::models::{GameRecord, NewGameRecord, NewPlayerFact, PlayerFact};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the store holding finished games and player facts.
pub trait GameStore: Send + Sync {
    /// Persist a finished game and return the canonical record.
    fn save_game(&self, game: NewGameRecord) -> BoxFuture<'static, StorageResult<GameRecord>>;
    /// Game with the given id, if any.
    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameRecord>>>;
    /// All games, newest date first.
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecord>>>;
    /// All facts, newest first.
    fn list_player_facts(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerFact>>>;
    /// Insert or replace the fact for `fact.player_name`.
    fn save_player_fact(&self, fact: NewPlayerFact)
    -> BoxFuture<'static, StorageResult<PlayerFact>>;
    /// Remove the fact for a player; `false` when none existed.
    fn delete_player_fact(&self, player_name: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Cheap round trip proving the store answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
