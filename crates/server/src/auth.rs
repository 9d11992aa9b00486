use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    AppState, cookies, db,
    error::{AppError, FieldErrors},
    messages::{self, Message},
    models::{FormPage, LoginForm, NextQuery, SignupForm, User},
};

pub const SESSION_COOKIE: &str = "sessionid";
pub const LOGIN_PATH: &str = "/accounts/login/";
pub const HOME_PATH: &str = "/polls/";

const USERNAME_MAX_LEN: usize = 150;
const PASSWORD_MIN_LEN: usize = 8;
const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

// ===== Passwords =====

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// ===== Sessions =====

/// Starts a session for `user` and returns the `Set-Cookie` value carrying it.
/// The session named by the request's cookie, if any, is replaced, and
/// expired sessions are pruned.
pub async fn login_user(
    state: &AppState,
    headers: &HeaderMap,
    user: &User,
) -> Result<String, AppError> {
    let now = Utc::now();
    if let Some(old) = cookies::read(headers, SESSION_COOKIE) {
        db::delete_session(&state.db, &old).await?;
    }
    let pruned = db::delete_expired_sessions(&state.db, now).await?;
    if pruned > 0 {
        debug!(pruned, "Deleted expired sessions");
    }

    let key = Uuid::new_v4().simple().to_string();
    db::insert_session(&state.db, &key, user.id, now + state.session_age).await?;

    info!(username = %user.username, "User logged in");
    Ok(cookies::set(
        SESSION_COOKIE,
        key,
        Some(state.session_age.num_seconds()),
    ))
}

/// The user behind the request's session cookie, if it names a live session.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, AppError> {
    let Some(key) = cookies::read(headers, SESSION_COOKIE) else {
        return Ok(None);
    };

    Ok(db::session_user(&state.db, &key, Utc::now()).await?)
}

/// Sends an anonymous client to the login page, remembering where it was.
pub fn login_redirect(next: &str) -> Response {
    Redirect::to(&format!("{LOGIN_PATH}?next={next}")).into_response()
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => HOME_PATH,
    }
}

// ===== Validation =====

pub fn validate_signup(form: &SignupForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let username = form.username.trim();

    if username.is_empty() {
        errors.entry("username").or_default().push("This field is required.".into());
    } else if username.chars().count() > USERNAME_MAX_LEN {
        errors.entry("username").or_default().push(format!(
            "Ensure this value has at most {USERNAME_MAX_LEN} characters."
        ));
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        errors.entry("username").or_default().push(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
    }

    if form.password1.is_empty() {
        errors.entry("password1").or_default().push("This field is required.".into());
    }
    if form.password2.is_empty() {
        errors.entry("password2").or_default().push("This field is required.".into());
    } else if form.password1 != form.password2 {
        errors
            .entry("password2")
            .or_default()
            .push("The two password fields didn't match.".into());
    } else {
        let password = &form.password2;
        if password.chars().count() < PASSWORD_MIN_LEN {
            errors.entry("password2").or_default().push(format!(
                "This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."
            ));
        }
        if password.chars().all(|c| c.is_ascii_digit()) {
            errors
                .entry("password2")
                .or_default()
                .push("This password is entirely numeric.".into());
        }
        if password.eq_ignore_ascii_case(username) {
            errors
                .entry("password2")
                .or_default()
                .push("The password is too similar to the username.".into());
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

// ===== Handlers =====

pub async fn signup_form(headers: HeaderMap) -> Response {
    messages::page(&headers, |messages| FormPage {
        form: "signup",
        fields: &["username", "password1", "password2"],
        next: None,
        messages,
    })
}

pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    validate_signup(&form).map_err(AppError::Form)?;

    let username = form.username.trim();
    if db::find_user_by_name(&state.db, username).await?.is_some() {
        return Err(username_taken());
    }

    let password_hash = hash_password(&form.password1)?;
    let user = match db::create_user(&state.db, username, &password_hash, Utc::now()).await {
        Ok(user) => user,
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(username_taken());
        }
        Err(err) => return Err(err.into()),
    };
    info!(username = %user.username, "User signed up");

    let session = login_user(&state, &headers, &user).await?;
    let mut response = messages::redirect(
        &headers,
        HOME_PATH,
        Message::success(format!("Welcome, {}!", user.username)),
    );
    append_cookie(&mut response, &session)?;
    Ok(response)
}

pub async fn login_form(headers: HeaderMap, Query(query): Query<NextQuery>) -> Response {
    messages::page(&headers, |messages| FormPage {
        form: "login",
        fields: &["username", "password"],
        next: query.next,
        messages,
    })
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = db::find_user_by_name(&state.db, form.username.trim()).await?;
    let Some(user) = user.filter(|user| verify_password(&form.password, &user.password_hash))
    else {
        let mut errors = FieldErrors::new();
        errors.insert("__all__", vec![BAD_CREDENTIALS.to_string()]);
        return Err(AppError::Form(errors));
    };

    let session = login_user(&state, &headers, &user).await?;
    let next = safe_next(form.next.as_deref().or(query.next.as_deref()));
    Ok(([(SET_COOKIE, session)], Redirect::to(next)).into_response())
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(key) = cookies::read(&headers, SESSION_COOKIE) {
        db::delete_session(&state.db, &key).await?;
    }

    let mut response = messages::redirect(
        &headers,
        HOME_PATH,
        Message::info("You have been logged out."),
    );
    append_cookie(&mut response, &cookies::remove(SESSION_COOKIE))?;
    Ok(response)
}

fn username_taken() -> AppError {
    let mut errors = FieldErrors::new();
    errors.insert("username", vec!["A user with that username already exists.".into()]);
    AppError::Form(errors)
}

fn append_cookie(response: &mut Response, cookie: &str) -> Result<(), AppError> {
    let value = cookie
        .parse()
        .map_err(|e| AppError::Internal(format!("Invalid cookie header: {e}")))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(())
}
