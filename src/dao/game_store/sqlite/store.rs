use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{
    Pool, Row, Sqlite,
    sqlite::{SqlitePoolOptions, SqliteRow},
};
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};
use tracing::info;

use crate::dao::{
    game_store::GameStore,
    models::{GameRecord, NewGameRecord, NewPlayerFact, PlayerFact, RecordIds},
    storage::StorageResult,
};

use super::{
    config::SqliteConfig,
    error::{SqliteDaoError, SqliteResult},
};

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS games (
        id           TEXT PRIMARY KEY,
        date         TEXT NOT NULL,
        player_names TEXT NOT NULL,
        scores       TEXT NOT NULL,
        final_totals TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS player_facts (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        player_name TEXT NOT NULL UNIQUE,
        fact        TEXT NOT NULL,
        created_at  TEXT NOT NULL
    )
    "#,
];

/// Authoritative store over a SQLite database.
#[derive(Clone)]
pub struct SqliteGameStore {
    pool: Pool<Sqlite>,
    ids: Arc<RecordIds>,
}

impl SqliteGameStore {
    /// Open the database, creating the file and tables when missing.
    pub async fn connect(config: SqliteConfig) -> SqliteResult<Self> {
        let options = config.connect_options()?;
        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.is_in_memory() {
            // Every connection to `:memory:` is a fresh database.
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|source| SqliteDaoError::Connect { source })?;

        let store = Self {
            pool,
            ids: Arc::new(RecordIds::new()),
        };
        store.ensure_schema().await?;
        info!(url = %config.database_url, "SQLite game store ready");
        Ok(store)
    }

    async fn ensure_schema(&self) -> SqliteResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|source| SqliteDaoError::Schema { source })?;
        }
        Ok(())
    }

    async fn insert_game(&self, game: NewGameRecord) -> SqliteResult<GameRecord> {
        let record = game.into_record(&self.ids);
        sqlx::query(
            "INSERT INTO games (id, date, player_names, scores, final_totals)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.date)
        .bind(encode_json("player_names", &record.player_names)?)
        .bind(encode_json("scores", &record.scores)?)
        .bind(encode_json("final_totals", &record.final_totals)?)
        .execute(&self.pool)
        .await
        .map_err(|source| SqliteDaoError::Query {
            operation: "insert game",
            source,
        })?;
        Ok(record)
    }

    async fn select_game(&self, id: &str) -> SqliteResult<Option<GameRecord>> {
        let row = sqlx::query(
            "SELECT id, date, player_names, scores, final_totals FROM games WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|source| SqliteDaoError::Query {
            operation: "select game",
            source,
        })?;
        row.as_ref().map(game_from_row).transpose()
    }

    async fn select_games(&self) -> SqliteResult<Vec<GameRecord>> {
        let rows = sqlx::query(
            "SELECT id, date, player_names, scores, final_totals FROM games
             ORDER BY date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|source| SqliteDaoError::Query {
            operation: "list games",
            source,
        })?;
        rows.iter().map(game_from_row).collect()
    }

    async fn select_facts(&self) -> SqliteResult<Vec<PlayerFact>> {
        let rows = sqlx::query(
            "SELECT id, player_name, fact, created_at FROM player_facts
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|source| SqliteDaoError::Query {
            operation: "list player facts",
            source,
        })?;
        rows.iter().map(fact_from_row).collect()
    }

    async fn upsert_fact(&self, fact: NewPlayerFact) -> SqliteResult<PlayerFact> {
        let created_at = fact
            .created_at
            .to_offset(UtcOffset::UTC)
            .format(&Rfc3339)
            .map_err(|source| SqliteDaoError::FormatTimestamp { source })?;
        let row = sqlx::query(
            "INSERT INTO player_facts (player_name, fact, created_at) VALUES (?, ?, ?)
             ON CONFLICT(player_name) DO UPDATE
             SET fact = excluded.fact, created_at = excluded.created_at
             RETURNING id",
        )
        .bind(&fact.player_name)
        .bind(&fact.fact)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|source| SqliteDaoError::Query {
            operation: "upsert player fact",
            source,
        })?;
        let id: i64 = row.try_get(0).map_err(|source| SqliteDaoError::Query {
            operation: "upsert player fact",
            source,
        })?;
        Ok(fact.with_id(Some(id)))
    }

    async fn remove_fact(&self, player_name: &str) -> SqliteResult<bool> {
        let result = sqlx::query("DELETE FROM player_facts WHERE player_name = ?")
            .bind(player_name)
            .execute(&self.pool)
            .await
            .map_err(|source| SqliteDaoError::Query {
                operation: "delete player fact",
                source,
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> SqliteResult<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|source| SqliteDaoError::Query {
                operation: "ping",
                source,
            })?;
        Ok(())
    }
}

fn encode_json<T: Serialize>(column: &'static str, value: &T) -> SqliteResult<String> {
    serde_json::to_string(value).map_err(|source| SqliteDaoError::Encode { column, source })
}

fn column<T>(row: &SqliteRow, column: &'static str) -> SqliteResult<T>
where
    T: for<'r> sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column).map_err(|source| SqliteDaoError::Query {
        operation: column,
        source,
    })
}

fn json_column<T: DeserializeOwned>(row: &SqliteRow, name: &'static str) -> SqliteResult<T> {
    let raw: String = column(row, name)?;
    serde_json::from_str(&raw).map_err(|source| SqliteDaoError::DecodeJson {
        column: name,
        source,
    })
}

fn game_from_row(row: &SqliteRow) -> SqliteResult<GameRecord> {
    Ok(GameRecord {
        id: column(row, "id")?,
        date: column(row, "date")?,
        player_names: json_column(row, "player_names")?,
        scores: json_column(row, "scores")?,
        final_totals: json_column(row, "final_totals")?,
    })
}

fn fact_from_row(row: &SqliteRow) -> SqliteResult<PlayerFact> {
    let created_at: String = column(row, "created_at")?;
    let created_at =
        OffsetDateTime::parse(&created_at, &Rfc3339).map_err(|source| {
            SqliteDaoError::Timestamp {
                column: "created_at",
                source,
            }
        })?;
    Ok(PlayerFact {
        id: Some(column(row, "id")?),
        player_name: column(row, "player_name")?,
        fact: column(row, "fact")?,
        created_at,
    })
}

impl GameStore for SqliteGameStore {
    fn save_game(&self, game: NewGameRecord) -> BoxFuture<'static, StorageResult<GameRecord>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.select_game(&id).await.map_err(Into::into) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.select_games().await.map_err(Into::into) })
    }

    fn list_player_facts(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerFact>>> {
        let store = self.clone();
        Box::pin(async move { store.select_facts().await.map_err(Into::into) })
    }

    fn save_player_fact(
        &self,
        fact: NewPlayerFact,
    ) -> BoxFuture<'static, StorageResult<PlayerFact>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_fact(fact).await.map_err(Into::into) })
    }

    fn delete_player_fact(&self, player_name: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.remove_fact(&player_name).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
