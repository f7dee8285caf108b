use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Immutable summary of one finished game, as stored and exchanged over the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// Timestamp-derived identifier.
    pub id: String,
    /// Calendar date the game was recorded (`YYYY-MM-DD`).
    pub date: String,
    /// Roster snapshot in seating order.
    pub player_names: Vec<String>,
    /// Round rows, one column per player; `null` marks an unrecorded cell.
    pub scores: Vec<Vec<Option<i32>>>,
    /// Per-player totals at save time.
    pub final_totals: Vec<i32>,
}

/// Game record before the store has assigned its canonical identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewGameRecord {
    /// Client-proposed identifier; the store assigns one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Client-proposed date; the store uses today when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Roster snapshot in seating order.
    pub player_names: Vec<String>,
    /// Round rows, one column per player.
    pub scores: Vec<Vec<Option<i32>>>,
    /// Per-player totals.
    pub final_totals: Vec<i32>,
}

impl NewGameRecord {
    /// Fill in any missing identity fields.
    pub fn into_record(self, ids: &RecordIds) -> GameRecord {
        GameRecord {
            id: self.id.unwrap_or_else(|| ids.next_id()),
            date: self.date.unwrap_or_else(today),
            player_names: self.player_names,
            scores: self.scores,
            final_totals: self.final_totals,
        }
    }
}

/// Free-text note attached to a player name, unique per name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerFact {
    /// Store-assigned identifier; absent for facts only held in the local cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Player the fact belongs to.
    pub player_name: String,
    /// The fact itself.
    pub fact: String,
    /// Creation time (RFC 3339).
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
}

/// Player fact as submitted for an upsert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayerFact {
    /// Player the fact belongs to.
    pub player_name: String,
    /// The fact itself.
    pub fact: String,
    /// Creation time (RFC 3339).
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
}

impl NewPlayerFact {
    /// Fact timestamped now.
    pub fn now(player_name: impl Into<String>, fact: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            fact: fact.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Attach a store identifier (or none, for cache-only facts).
    pub fn with_id(self, id: Option<i64>) -> PlayerFact {
        PlayerFact {
            id,
            player_name: self.player_name,
            fact: self.fact,
            created_at: self.created_at,
        }
    }
}

/// Snapshot of the in-progress game kept under the `currentGame` cache key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGameEntity {
    /// Roster in seating order.
    pub players: Vec<String>,
    /// Round currently being scored (ignored once `complete`).
    pub current_round: u8,
    /// All nine rounds are scored and the final save is pending.
    pub complete: bool,
    /// Round rows, one column per player.
    pub scores: Vec<Vec<Option<i32>>>,
    /// When the game started.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

/// Issues strictly increasing, millisecond-based record identifiers.
#[derive(Debug, Default)]
pub struct RecordIds {
    last: AtomicU64,
}

impl RecordIds {
    /// Fresh generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in milliseconds, bumped past the previous id when the
    /// clock has not moved.
    pub fn next_id(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate.to_string(),
                Err(actual) => previous = actual,
            }
        }
    }
}

/// Today's UTC date as `YYYY-MM-DD`.
pub fn today() -> String {
    OffsetDateTime::now_utc().date().to_string()
}

/// Sort records newest first. Records sharing a date keep their relative order.
pub fn sort_by_date_desc(records: &mut [GameRecord]) {
    records.sort_by(|a, b| b.date.cmp(&a.date));
}
