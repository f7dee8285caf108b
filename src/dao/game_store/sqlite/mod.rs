mod config;
mod error;
mod store;

pub use config::SqliteConfig;
pub use error::SqliteDaoError;
pub use store::SqliteGameStore;
