mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{cookies, json, location};
use polls::db;

#[tokio::test]
async fn signup_form_lists_fields() {
    let app = common::spawn().await;

    let body = json(app.get("/signup/", None).await).await;
    assert_eq!(body["form"], "signup");
    assert_eq!(
        body["fields"],
        serde_json::json!(["username", "password1", "password2"])
    );
}

#[tokio::test]
async fn signup_logs_in_and_redirects_to_index() {
    let app = common::spawn().await;

    let response = app
        .post_form(
            "/signup/",
            "username=alice&password1=correct+horse&password2=correct+horse",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/polls/");

    let session = cookies(&response);
    assert!(session.contains("sessionid="), "{session}");

    // The new session can vote right away.
    let id = app.create_question("Question.", -1).await;
    let choice = app.create_choice(id, "Yes").await;
    let response = app
        .post_form(&format!("/polls/{id}/vote/"), &format!("choice={choice}"), Some(&session))
        .await;
    assert_eq!(location(&response), format!("/polls/{id}/results/"));
    assert_eq!(app.vote_count().await, 1);
}

#[tokio::test]
async fn signup_rejects_mismatched_passwords() {
    let app = common::spawn().await;

    let response = app
        .post_form(
            "/signup/",
            "username=alice&password1=correct+horse&password2=battery+staple",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert_eq!(
        body["errors"]["password2"][0],
        "The two password fields didn't match."
    );
}

#[tokio::test]
async fn signup_rejects_taken_username() {
    let app = common::spawn().await;
    app.login_as("alice").await;

    let response = app
        .post_form(
            "/signup/",
            "username=alice&password1=correct+horse&password2=correct+horse",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert!(body["errors"]["username"].is_array());
}

#[tokio::test]
async fn login_follows_next() {
    let app = common::spawn().await;
    app.login_as("alice").await;

    let response = app
        .post_form(
            "/accounts/login/?next=/polls/3/",
            "username=alice&password=correct+horse",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/polls/3/");
    assert!(cookies(&response).starts_with("sessionid="));
}

#[tokio::test]
async fn login_ignores_offsite_next() {
    let app = common::spawn().await;
    app.login_as("alice").await;

    let response = app
        .post_form(
            "/accounts/login/",
            "username=alice&password=correct+horse&next=%2F%2Fevil.example%2F",
            None,
        )
        .await;
    assert_eq!(location(&response), "/polls/");
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = common::spawn().await;
    app.login_as("alice").await;

    let response = app
        .post_form("/accounts/login/", "username=alice&password=wrong", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert!(body["errors"]["__all__"].is_array());
}

#[tokio::test]
async fn login_rejects_unknown_user() {
    let app = common::spawn().await;

    let response = app
        .post_form("/accounts/login/", "username=nobody&password=whatever", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_ends_session() {
    let app = common::spawn().await;
    let id = app.create_question("Question.", -1).await;
    let choice = app.create_choice(id, "Yes").await;
    let session = app.login_as("alice").await;

    let response = app.post_form("/accounts/logout/", "", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/polls/");
    assert!(cookies(&response).contains("sessionid="));

    let response = app
        .post_form(&format!("/polls/{id}/vote/"), &format!("choice={choice}"), Some(&session))
        .await;
    assert!(location(&response).starts_with("/accounts/login/"));
}

#[tokio::test]
async fn expired_session_is_anonymous() {
    let app = common::spawn().await;
    let id = app.create_question("Question.", -1).await;
    let choice = app.create_choice(id, "Yes").await;
    let session = app.login_as("alice").await;
    sqlx::query("UPDATE sessions SET expires_at = $1")
        .bind(Utc::now() - Duration::minutes(1))
        .execute(&app.db)
        .await
        .unwrap();

    let response = app
        .post_form(&format!("/polls/{id}/vote/"), &format!("choice={choice}"), Some(&session))
        .await;
    assert!(location(&response).starts_with("/accounts/login/"));
    assert_eq!(app.vote_count().await, 0);
}

#[tokio::test]
async fn login_prunes_expired_sessions() {
    let app = common::spawn().await;
    app.login_as("alice").await;
    let alice = db::find_user_by_name(&app.db, "alice").await.unwrap().unwrap();
    db::insert_session(&app.db, "stale", alice.id, Utc::now() - Duration::days(1))
        .await
        .unwrap();

    let response = app
        .post_form("/accounts/login/", "username=alice&password=correct+horse", None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert!(!session_exists(&app, "stale").await);
    assert!(session_exists(&app, "session-alice").await);
}

#[tokio::test]
async fn login_replaces_the_previous_session() {
    let app = common::spawn().await;
    let session = app.login_as("alice").await;

    let response = app
        .post_form(
            "/accounts/login/",
            "username=alice&password=correct+horse",
            Some(&session),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert!(!session_exists(&app, "session-alice").await);
    let fresh = cookies(&response);
    let key = fresh.trim_start_matches("sessionid=");
    assert!(session_exists(&app, key).await);
}

async fn session_exists(app: &common::TestApp, key: &str) -> bool {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sessions WHERE session_key = $1)")
        .bind(key)
        .fetch_one(&app.db)
        .await
        .unwrap()
}
