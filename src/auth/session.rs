use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub const TOKEN_LENGTH: usize = 64;

/// Generate a random bearer token.
pub fn generate_session_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// When a session issued at `now` with lifetime `ttl` stops being accepted.
#[must_use]
pub fn session_expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Pull the `session=` value out of a `Cookie` header value.
#[must_use]
pub fn parse_session_cookie(header_value: &str) -> Option<&str> {
    header_value
        .split(';')
        .find_map(|cookie| cookie.trim().strip_prefix("session="))
        .filter(|token| !token.is_empty())
}
