use crate::db::{Database, DbError};
use crate::models::watchlist::{AnimeStatus, WatchlistEntry, WatchlistUpdate};
use anime_catalog_client::Anime;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ENTRY_COLUMNS: &str = "user_id, anime_id, anime_title, anime_genres, anime_episodes, \
     status, rating, notes, progress_episodes, updated_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<WatchlistEntry> {
    let genres: String = row.get("anime_genres")?;
    let anime_genres = serde_json::from_str(&genres)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err)))?;

    Ok(WatchlistEntry {
        user_id: row.get("user_id")?,
        anime_id: row.get("anime_id")?,
        anime_title: row.get("anime_title")?,
        anime_genres,
        anime_episodes: row.get("anime_episodes")?,
        status: row.get("status")?,
        rating: row.get("rating")?,
        notes: row.get("notes")?,
        progress_episodes: row.get("progress_episodes")?,
        updated_at: row.get("updated_at")?,
    })
}

fn select_one(
    conn: &Connection,
    user_id: &str,
    anime_id: &str,
) -> rusqlite::Result<Option<WatchlistEntry>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM watchlist_items WHERE user_id = ?1 AND anime_id = ?2",
            ENTRY_COLUMNS
        ),
        params![user_id, anime_id],
        entry_from_row,
    )
    .optional()
}

fn genres_json(genres: &[String]) -> String {
    serde_json::Value::from(genres.to_vec()).to_string()
}

/// All entries of a user, most recently updated first.
pub async fn list(db: &Database, user_id: &str) -> Result<Vec<WatchlistEntry>, DbError> {
    let user_id = user_id.to_string();
    db.call(move |conn| {
        conn.prepare(&format!(
            "SELECT {} FROM watchlist_items WHERE user_id = ?1 ORDER BY updated_at DESC",
            ENTRY_COLUMNS
        ))?
        .query_map(params![user_id], entry_from_row)?
        .collect()
    })
    .await
}

pub async fn get(
    db: &Database,
    user_id: &str,
    anime_id: &str,
) -> Result<Option<WatchlistEntry>, DbError> {
    let (user_id, anime_id) = (user_id.to_string(), anime_id.to_string());
    db.call(move |conn| select_one(conn, &user_id, &anime_id)).await
}

/// Add `anime` to the list with a snapshot of its catalog data.
pub async fn add(
    db: &Database,
    user_id: &str,
    anime: &Anime,
    status: AnimeStatus,
) -> Result<WatchlistEntry, DbError> {
    let entry = WatchlistEntry {
        user_id: user_id.to_string(),
        anime_id: anime.id.clone(),
        anime_title: anime.title.clone(),
        anime_genres: anime.genres.clone(),
        anime_episodes: anime.episodes,
        status,
        rating: None,
        notes: String::new(),
        progress_episodes: 0,
        updated_at: Utc::now(),
    };

    let row = entry.clone();
    db.call(move |conn| {
        conn.execute(
            &format!(
                "INSERT INTO watchlist_items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                ENTRY_COLUMNS
            ),
            params![
                row.user_id,
                row.anime_id,
                row.anime_title,
                genres_json(&row.anime_genres),
                row.anime_episodes,
                row.status,
                row.rating,
                row.notes,
                row.progress_episodes,
                row.updated_at
            ],
        )
    })
    .await?;
    Ok(entry)
}

/// Apply `update` to an existing entry. `None` when the entry does not exist.
pub async fn update(
    db: &Database,
    user_id: &str,
    anime_id: &str,
    update: WatchlistUpdate,
) -> Result<Option<WatchlistEntry>, DbError> {
    let (user_id, anime_id) = (user_id.to_string(), anime_id.to_string());
    db.call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut entry) = select_one(&tx, &user_id, &anime_id)? else {
            return Ok(None);
        };
        entry.apply(update);

        tx.execute(
            "UPDATE watchlist_items
             SET status = ?3, rating = ?4, notes = ?5, progress_episodes = ?6, updated_at = ?7
             WHERE user_id = ?1 AND anime_id = ?2",
            params![
                user_id,
                anime_id,
                entry.status,
                entry.rating,
                entry.notes,
                entry.progress_episodes,
                entry.updated_at
            ],
        )?;
        tx.commit()?;
        Ok(Some(entry))
    })
    .await
}

/// `true` if an entry was removed.
pub async fn remove(db: &Database, user_id: &str, anime_id: &str) -> Result<bool, DbError> {
    let (user_id, anime_id) = (user_id.to_string(), anime_id.to_string());
    let deleted = db
        .call(move |conn| {
            conn.execute(
                "DELETE FROM watchlist_items WHERE user_id = ?1 AND anime_id = ?2",
                params![user_id, anime_id],
            )
        })
        .await?;
    Ok(deleted > 0)
}
