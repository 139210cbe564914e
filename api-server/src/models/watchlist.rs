use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AnimeStatus {
    #[default]
    Plan,
    Watching,
    Completed,
    Dropped,
}

impl ToSql for AnimeStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_ref()))
    }
}

impl FromSql for AnimeStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

/// One anime on a user's list. Title, genres and episode count are copied
/// from the catalog when the entry is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub user_id: String,
    pub anime_id: String,
    pub anime_title: String,
    pub anime_genres: Vec<String>,
    pub anime_episodes: u32,
    pub status: AnimeStatus,
    pub rating: Option<f64>,
    pub notes: String,
    pub progress_episodes: u32,
    pub updated_at: DateTime<Utc>,
}

/// Fields a PATCH may change. `rating: Some(None)` clears the rating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchlistUpdate {
    pub status: Option<AnimeStatus>,
    pub rating: Option<Option<f64>>,
    pub notes: Option<String>,
    pub progress_episodes: Option<u32>,
}

impl WatchlistEntry {
    pub fn apply(&mut self, update: WatchlistUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(rating) = update.rating {
            self.rating = rating;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
        if let Some(progress) = update.progress_episodes {
            self.progress_episodes = progress;
        }
        self.updated_at = Utc::now();
    }
}
