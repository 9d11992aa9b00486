//! Poll questions with a publication window, one vote per user per question,
//! and result tallies, served as JSON pages over axum.

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use sqlx::SqlitePool;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod auth;
pub mod config;
pub mod cookies;
pub mod db;
pub mod error;
pub mod handlers;
pub mod messages;
pub mod models;

use config::Config;

// ===== App State =====

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub session_age: chrono::Duration,
}

impl AppState {
    pub fn new(db: SqlitePool, session_age_secs: i64) -> Self {
        Self {
            db,
            session_age: chrono::Duration::seconds(session_age_secs),
        }
    }
}

// ===== Router =====

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/polls/", get(handlers::index))
        .route("/polls/:question_id/", get(handlers::detail))
        .route(
            "/polls/:question_id/vote/",
            get(handlers::vote_page).post(handlers::vote),
        )
        .route("/polls/:question_id/results/", get(handlers::results))
        .route("/signup/", get(auth::signup_form).post(auth::signup))
        .route("/accounts/login/", get(auth::login_form).post(auth::login))
        .route("/accounts/logout/", post(auth::logout))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let db = db::connect(&config.database_url, config.max_connections).await?;
    info!("Connected to {}", config.database_url);

    let pruned = db::delete_expired_sessions(&db, chrono::Utc::now()).await?;
    info!("Deleted {pruned} expired sessions");

    let state = AppState::new(db, config.session_age_secs);

    let listener = TcpListener::bind(config.addr).await?;
    info!("Server running on http://{}", config.addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

// ===== Handlers =====

async fn root() -> Redirect {
    Redirect::to(auth::HOME_PATH)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => Json(serde_json::json!({
            "status": "ok",
            "database": "connected"
        })),
        Err(_) => Json(serde_json::json!({
            "status": "error",
            "database": "disconnected"
        })),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
