use chrono::{DateTime, Utc};
use sqlx::{
    Executor, Sqlite, SqlitePool, migrate::Migrator, sqlite::SqlitePoolOptions,
};

use crate::models::{Choice, ChoiceTally, Question, User, Vote};

static MIGRATOR: Migrator = sqlx::migrate!();

/// Opens the pool and brings the schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let db = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    MIGRATOR.run(&db).await?;
    Ok(db)
}

// ===== Questions =====

/// The `limit` most recently published questions, newest first.
pub async fn latest_published(
    db: &SqlitePool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, question_text, pub_date, end_date FROM questions
         WHERE pub_date <= $1
         ORDER BY pub_date DESC, id DESC
         LIMIT $2",
    )
    .bind(now)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn find_question(db: &SqlitePool, id: i64) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as("SELECT id, question_text, pub_date, end_date FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn question_exists<'e, E>(db: E, question_text: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM questions WHERE question_text = $1)")
        .bind(question_text)
        .fetch_one(db)
        .await
}

pub async fn create_question<'e, E>(
    db: E,
    question_text: &str,
    pub_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar(
        "INSERT INTO questions (question_text, pub_date, end_date)
         VALUES ($1, $2, $3)
         RETURNING id",
    )
    .bind(question_text)
    .bind(pub_date)
    .bind(end_date)
    .fetch_one(db)
    .await
}

// ===== Choices =====

pub async fn create_choice<'e, E>(
    db: E,
    question_id: i64,
    choice_text: &str,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("INSERT INTO choices (question_id, choice_text) VALUES ($1, $2) RETURNING id")
        .bind(question_id)
        .bind(choice_text)
        .fetch_one(db)
        .await
}

pub async fn choices_for(db: &SqlitePool, question_id: i64) -> Result<Vec<Choice>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, question_id, choice_text FROM choices WHERE question_id = $1 ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(db)
    .await
}

/// Looks up a choice only if it belongs to `question_id`.
pub async fn find_choice(
    db: &SqlitePool,
    question_id: i64,
    choice_id: i64,
) -> Result<Option<Choice>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, question_id, choice_text FROM choices WHERE id = $1 AND question_id = $2",
    )
    .bind(choice_id)
    .bind(question_id)
    .fetch_optional(db)
    .await
}

/// Every choice of the question with its vote count, including zeroes.
pub async fn tally(db: &SqlitePool, question_id: i64) -> Result<Vec<ChoiceTally>, sqlx::Error> {
    sqlx::query_as(
        "SELECT c.id, c.choice_text, COUNT(v.id) AS votes
         FROM choices c
         LEFT JOIN votes v ON v.choice_id = c.id
         WHERE c.question_id = $1
         GROUP BY c.id, c.choice_text
         ORDER BY c.id",
    )
    .bind(question_id)
    .fetch_all(db)
    .await
}

// ===== Votes =====

pub async fn find_vote(
    db: &SqlitePool,
    user_id: i64,
    question_id: i64,
) -> Result<Option<Vote>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, user_id, question_id, choice_id, created_at FROM votes
         WHERE user_id = $1 AND question_id = $2",
    )
    .bind(user_id)
    .bind(question_id)
    .fetch_optional(db)
    .await
}

/// Creates the user's vote on the choice's question, or moves the existing
/// one to `choice`. A single statement, so concurrent submissions from the
/// same user still leave one row.
pub async fn record_vote(
    db: &SqlitePool,
    user_id: i64,
    choice: &Choice,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO votes (user_id, question_id, choice_id, created_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id, question_id)
         DO UPDATE SET choice_id = excluded.choice_id, created_at = excluded.created_at",
    )
    .bind(user_id)
    .bind(choice.question_id)
    .bind(choice.id)
    .bind(now)
    .execute(db)
    .await?;

    Ok(())
}

// ===== Users & sessions =====

pub async fn find_user_by_name(db: &SqlitePool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, username, password_hash, date_joined FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(db)
    .await
}

pub async fn create_user(
    db: &SqlitePool,
    username: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO users (username, password_hash, date_joined)
         VALUES ($1, $2, $3)
         RETURNING id, username, password_hash, date_joined",
    )
    .bind(username)
    .bind(password_hash)
    .bind(now)
    .fetch_one(db)
    .await
}

pub async fn insert_session(
    db: &SqlitePool,
    session_key: &str,
    user_id: i64,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO sessions (session_key, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(session_key)
        .bind(user_id)
        .bind(expires_at)
        .execute(db)
        .await?;

    Ok(())
}

/// Owner of an unexpired session.
pub async fn session_user(
    db: &SqlitePool,
    session_key: &str,
    now: DateTime<Utc>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        "SELECT u.id, u.username, u.password_hash, u.date_joined
         FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.session_key = $1 AND s.expires_at > $2",
    )
    .bind(session_key)
    .bind(now)
    .fetch_optional(db)
    .await
}

/// Removes every session that expired at or before `now`; returns how many.
pub async fn delete_expired_sessions(
    db: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
        .bind(now)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_session(db: &SqlitePool, session_key: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE session_key = $1")
        .bind(session_key)
        .execute(db)
        .await?;

    Ok(())
}
