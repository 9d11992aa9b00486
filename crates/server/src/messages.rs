//! One-shot flash messages.
//!
//! A redirecting handler queues a message in the `messages` cookie; the next
//! page that renders picks the queue up, includes it in its body and expires
//! the cookie.

use axum::{
    Json,
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cookies;

pub const COOKIE_NAME: &str = "messages";
/// Older messages are dropped once the queue grows past this.
pub const MAX_QUEUED: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

/// Messages queued by earlier responses. A tampered or stale cookie reads as
/// an empty queue.
pub fn pending(headers: &HeaderMap) -> Vec<Message> {
    cookies::read(headers, COOKIE_NAME)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

/// `303 See Other` to `to`, with `message` appended to the pending queue.
/// Only the newest [`MAX_QUEUED`] messages are kept.
pub fn redirect(headers: &HeaderMap, to: &str, message: Message) -> Response {
    let mut queue = pending(headers);
    queue.push(message);
    if queue.len() > MAX_QUEUED {
        queue.drain(..queue.len() - MAX_QUEUED);
    }

    match serde_json::to_string(&queue) {
        Ok(value) => (
            [(SET_COOKIE, cookies::set(COOKIE_NAME, value, None))],
            Redirect::to(to),
        )
            .into_response(),
        Err(err) => {
            warn!("Dropping flash messages: {err}");
            Redirect::to(to).into_response()
        }
    }
}

/// Renders a JSON page built from the pending messages and clears the queue.
pub fn page<T, F>(headers: &HeaderMap, build: F) -> Response
where
    T: Serialize,
    F: FnOnce(Vec<Message>) -> T,
{
    let queue = pending(headers);
    let had_messages = cookies::read(headers, COOKIE_NAME).is_some();
    let body = Json(build(queue));

    if had_messages {
        ([(SET_COOKIE, cookies::remove(COOKIE_NAME))], body).into_response()
    } else {
        body.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode, header::COOKIE};

    fn cookie_pair(response: &Response) -> String {
        let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    #[test]
    fn redirect_queues_behind_existing_messages() {
        let first = redirect(&HeaderMap::new(), "/polls/", Message::info("one"));
        assert_eq!(first.status(), StatusCode::SEE_OTHER);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&cookie_pair(&first)).unwrap());
        let second = redirect(&headers, "/polls/", Message::error("two"));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&cookie_pair(&second)).unwrap());
        assert_eq!(
            pending(&headers),
            vec![Message::info("one"), Message::error("two")]
        );
    }

    #[test]
    fn redirect_keeps_only_the_newest_messages() {
        let mut headers = HeaderMap::new();
        for i in 0..MAX_QUEUED + 5 {
            let response = redirect(&headers, "/polls/", Message::info(format!("note {i}")));
            headers = HeaderMap::new();
            headers.insert(COOKIE, HeaderValue::from_str(&cookie_pair(&response)).unwrap());
        }

        let queue = pending(&headers);
        assert_eq!(queue.len(), MAX_QUEUED);
        assert_eq!(queue[0], Message::info("note 5"));
        assert_eq!(queue[MAX_QUEUED - 1], Message::info(format!("note {}", MAX_QUEUED + 4)));
    }

    #[test]
    fn garbage_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("messages=not-json"));
        assert!(pending(&headers).is_empty());
    }

    #[test]
    fn page_without_messages_sets_no_cookie() {
        let response = page(&HeaderMap::new(), |messages| messages.len());
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
