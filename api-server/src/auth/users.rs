use super::password::{hash_password_blocking, PasswordError};
use crate::db::{Database, DbError};
use crate::models::user::User;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

pub const DEMO_EMAIL: &str = "demo@anime.app";
pub const DEMO_USERNAME: &str = "demo_user";
pub const DEMO_PASSWORD: &str = "password123";

const USER_COLUMNS: &str = "id, email, username, password_hash, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        created_at: row.get("created_at")?,
    })
}

pub async fn find_by_email(db: &Database, email: &str) -> Result<Option<User>, DbError> {
    let email = email.to_lowercase();
    db.call(move |conn| {
        conn.query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            params![email],
            user_from_row,
        )
        .optional()
    })
    .await
}

pub async fn find_by_id(db: &Database, id: &str) -> Result<Option<User>, DbError> {
    let id = id.to_string();
    db.call(move |conn| {
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id],
            user_from_row,
        )
        .optional()
    })
    .await
}

/// Insert a new account. The email is stored lowercased; a duplicate email
/// surfaces as a constraint violation.
pub async fn create(
    db: &Database,
    email: &str,
    username: &str,
    password_hash: String,
) -> Result<User, DbError> {
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.to_lowercase(),
        username: username.to_string(),
        password_hash,
        created_at: Utc::now(),
    };
    let row = user.clone();
    db.call(move |conn| {
        conn.execute(
            &format!("INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5)", USER_COLUMNS),
            params![
                row.id,
                row.email,
                row.username,
                row.password_hash,
                row.created_at
            ],
        )
    })
    .await?;
    Ok(user)
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Make sure the demo account exists. Returns `true` when it was created.
pub async fn ensure_demo_user(db: &Database) -> Result<bool, SeedError> {
    if find_by_email(db, DEMO_EMAIL).await?.is_some() {
        return Ok(false);
    }
    let password_hash = hash_password_blocking(DEMO_PASSWORD.to_string()).await?;
    create(db, DEMO_EMAIL, DEMO_USERNAME, password_hash).await?;
    log::info!("Seeded demo account {}", DEMO_EMAIL);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;

    fn database() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().unwrap();
        db
    }

    #[tokio::test]
    async fn create_then_find() {
        let db = database();
        let user = create(&db, "Someone@Example.com", "someone", "hash".into())
            .await
            .unwrap();
        assert_eq!(user.email, "someone@example.com");

        let by_email = find_by_email(&db, "SOMEONE@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
        let by_id = find_by_id(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "someone");
        assert!(find_by_id(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_constraint_violation() {
        let db = database();
        create(&db, "a@b.co", "a", "hash".into()).await.unwrap();
        let err = create(&db, "A@b.co", "a2", "hash".into()).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn demo_user_is_seeded_once() {
        let db = database();
        assert!(ensure_demo_user(&db).await.unwrap());
        assert!(!ensure_demo_user(&db).await.unwrap());
        let demo = find_by_email(&db, DEMO_EMAIL).await.unwrap().unwrap();
        assert!(verify_password(DEMO_PASSWORD, &demo.password_hash));
    }
}
