#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use chrono::{Duration, Utc};
use polls::{AppState, auth, db};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    _dir: TempDir,
}

pub async fn spawn() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("polls.db").display());
    let db = db::connect(&database_url, 5)
        .await
        .expect("Failed to open SQLite database");

    let router = polls::app(AppState::new(db.clone(), 3600));
    TestApp {
        router,
        db,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("Router failed")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    /// Question published `days` from now (negative for the past).
    pub async fn create_question(&self, text: &str, days: i64) -> i64 {
        db::create_question(&self.db, text, Utc::now() + Duration::days(days), None)
            .await
            .unwrap()
    }

    pub async fn create_closed_question(&self, text: &str) -> i64 {
        let now = Utc::now();
        db::create_question(
            &self.db,
            text,
            now - Duration::days(30),
            Some(now - Duration::days(1)),
        )
        .await
        .unwrap()
    }

    pub async fn create_choice(&self, question_id: i64, text: &str) -> i64 {
        db::create_choice(&self.db, question_id, text).await.unwrap()
    }

    /// Creates a user with a live session and returns the `Cookie` header.
    pub async fn login_as(&self, username: &str) -> String {
        let hash = auth::hash_password("correct horse").unwrap();
        let user = db::create_user(&self.db, username, &hash, Utc::now())
            .await
            .unwrap();
        let key = format!("session-{username}");
        db::insert_session(&self.db, &key, user.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        format!("{}={key}", auth::SESSION_COOKIE)
    }

    pub async fn vote_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM votes")
            .fetch_one(&self.db)
            .await
            .unwrap()
    }
}

pub async fn json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("No Location header")
        .to_str()
        .unwrap()
}

/// `name=value` pairs of every `Set-Cookie` header, ready for a `Cookie` header.
pub fn cookies(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn texts(list: &Value, key: &str) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|item| item[key].as_str().unwrap().to_string())
        .collect()
}
