use std::str::FromStr;

use sqlx::sqlite::SqliteConnectOptions;

use super::error::{SqliteDaoError, SqliteResult};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Runtime configuration describing how to open the SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// sqlx connection string, e.g. `sqlite://play-nine.db`.
    pub database_url: String,
    /// Pool size.
    pub max_connections: u32,
}

impl SqliteConfig {
    /// Configuration for a database URL such as `sqlite://play-nine.db`.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Private in-memory database, mostly useful for tests.
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    /// In-memory databases live as long as their single connection.
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    pub(super) fn connect_options(&self) -> SqliteResult<SqliteConnectOptions> {
        SqliteConnectOptions::from_str(&self.database_url)
            .map(|options| options.create_if_missing(true))
            .map_err(|source| SqliteDaoError::InvalidUrl {
                url: self.database_url.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_memory_urls() {
        assert!(SqliteConfig::in_memory().is_in_memory());
        assert!(SqliteConfig::new("sqlite://file:games?mode=memory").is_in_memory());
        assert!(!SqliteConfig::new("sqlite://play-nine.db").is_in_memory());
    }
}
