use axum::routing::{get, post};
use axum::Router;

use super::{auth, board, AppState};

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/authenticate", get(auth::authenticate))
        .route("/auth/logout", post(auth::logout))
        // Board writes
        .route("/board/create", post(board::create_post))
        .route("/board/answer/create", post(board::create_reply))
        .route("/board/update", post(board::update_post))
        .route("/board/delete", post(board::delete_post))
        .route("/board/history/comment", post(board::add_comment))
        // Board reads
        .route("/board/history", get(board::history))
        .route("/board/history/detail", get(board::detail))
        .route("/board/search", get(board::search))
}

async fn healthz() -> &'static str {
    "OK"
}
