use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::response::{
    internal_error, invalid, rejected_json, reply, Envelope, STATUS_BAD_CREDENTIALS, STATUS_OK,
};
use super::AppState;
use crate::auth::{
    generate_session_token, hash_password, session_expiry, session_token, validate_password_strength,
    validate_username, verify_password, RequireUser,
};
use crate::db as queries;
use crate::db::format_timestamp;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPayload {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: String,
}

fn bad_credentials() -> Response {
    reply(
        StatusCode::UNAUTHORIZED,
        Envelope::bare(STATUS_BAD_CREDENTIALS, "Invalid username or password"),
    )
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejected_json(&rejection),
    };

    if let Err(e) = validate_username(&req.username) {
        return invalid(e.to_string());
    }
    if let Err(e) = validate_password_strength(&req.password) {
        return invalid(e.to_string());
    }

    match queries::username_exists(state.db.pool(), &req.username).await {
        Ok(true) => return invalid("Username already taken"),
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Failed to check username: {e:#}");
            return internal_error();
        }
    }

    let password_hash = match hash_password(&req.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Failed to hash password: {e:#}");
            return internal_error();
        }
    };

    let user_id = match queries::create_user(state.db.pool(), &req.username, &password_hash).await {
        Ok(id) => id,
        Err(e) => {
            // Lost a race with a concurrent registration of the same name
            if e.chain().any(|cause| cause.to_string().contains("UNIQUE")) {
                return invalid("Username already taken");
            }
            tracing::error!("Failed to create user: {e:#}");
            return internal_error();
        }
    };

    tracing::info!(user_id, username = %req.username, "Registered user");

    match queries::get_user_by_id(state.db.pool(), user_id).await {
        Ok(Some(user)) => reply(
            StatusCode::CREATED,
            Envelope::with_result(STATUS_OK, "Registration complete", user),
        ),
        Ok(None) => internal_error(),
        Err(e) => {
            tracing::error!("Failed to load new user: {e:#}");
            internal_error()
        }
    }
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejected_json(&rejection),
    };

    let user = match queries::get_user_by_username(state.db.pool(), &req.username).await {
        Ok(Some(u)) => u,
        Ok(None) => return bad_credentials(),
        Err(e) => {
            tracing::error!("Failed to look up user: {e:#}");
            return internal_error();
        }
    };

    match verify_password(&req.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(username = %user.username, "Rejected login");
            return bad_credentials();
        }
        Err(e) => {
            tracing::error!(user_id = user.id, "Stored password hash is unreadable: {e:#}");
            return internal_error();
        }
    }

    let token = generate_session_token();
    let expires_at = format_timestamp(session_expiry(Utc::now(), state.config.session_ttl));

    if let Err(e) = queries::create_session(state.db.pool(), user.id, &token, &expires_at).await {
        tracing::error!("Failed to create session: {e:#}");
        return internal_error();
    }

    tracing::info!(user_id = user.id, "User logged in");

    let bearer = format!("Bearer {token}");
    let mut response = reply(
        StatusCode::OK,
        Envelope::with_result(
            STATUS_OK,
            "Login successful",
            TokenPayload {
                access_token: token,
                token_type: "Bearer",
                expires_at,
            },
        ),
    );
    if let Ok(value) = HeaderValue::from_str(&bearer) {
        response.headers_mut().insert(header::AUTHORIZATION, value);
    }
    response
}

/// GET /auth/authenticate
pub async fn authenticate(RequireUser(user): RequireUser) -> Response {
    reply(
        StatusCode::OK,
        Envelope::with_result(STATUS_OK, "Authenticated", user),
    )
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    headers: HeaderMap,
) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = queries::delete_session(state.db.pool(), token).await {
            tracing::error!("Failed to delete session: {e:#}");
            return internal_error();
        }
    }

    tracing::info!(user_id = user.id, "User logged out");
    reply(StatusCode::OK, Envelope::bare(STATUS_OK, "Logged out"))
}
