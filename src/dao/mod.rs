/// Stores for finished games and player facts.
pub mod game_store;
/// JSON file cache used while the store is unreachable.
pub mod local_cache;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
