use axum::http::{HeaderMap, header::COOKIE};
use cookie::{Cookie, SameSite, time::Duration};

/// Value of the first cookie called `name` across all `Cookie` headers.
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse_encoded(value))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// `Set-Cookie` value for an HttpOnly, site-wide cookie. Without `max_age`
/// the cookie lasts for the browser session.
pub fn set(name: &str, value: String, max_age: Option<i64>) -> String {
    let mut builder = Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    if let Some(secs) = max_age {
        builder = builder.max_age(Duration::seconds(secs));
    }
    builder.build().encoded().to_string()
}

pub fn remove(name: &str) -> String {
    let mut cookie = Cookie::build((name.to_string(), "")).path("/").build();
    cookie.make_removal();
    cookie.to_string()
}
