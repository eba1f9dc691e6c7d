//! Board endpoints. Writes need a session; reads are public.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use super::response::{
    from_outcome, from_page, invalid, rejected_json, rejected_query, STATUS_CREATE_FAILED,
    STATUS_INTERNAL,
};
use super::AppState;
use crate::auth::RequireUser;
use crate::db::SearchField;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateReplyRequest {
    #[serde(alias = "board_id")]
    pub parent_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct DeletePostRequest {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    #[serde(alias = "board_id")]
    pub post_id: i64,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub pattern: String,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DetailParams {
    pub id: i64,
}

pub async fn create_post(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejected_json(&rejection),
    };

    let outcome = state
        .board
        .create_post(&user.username, &req.title, &req.body)
        .await;
    from_outcome(outcome, StatusCode::CREATED, "Post created", STATUS_CREATE_FAILED)
}

pub async fn create_reply(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: Result<Json<CreateReplyRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejected_json(&rejection),
    };

    let outcome = state
        .board
        .create_reply(req.parent_id, &user.username, &req.title, &req.body)
        .await;
    from_outcome(outcome, StatusCode::CREATED, "Reply created", STATUS_CREATE_FAILED)
}

pub async fn update_post(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejected_json(&rejection),
    };

    let outcome = state.board.update_post(req.id, &req.title, &req.body).await;
    from_outcome(outcome, StatusCode::OK, "Post updated", STATUS_INTERNAL)
}

pub async fn delete_post(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
    payload: Result<Json<DeletePostRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejected_json(&rejection),
    };

    let outcome = state.board.delete_post(req.id).await;
    from_outcome(outcome, StatusCode::OK, "Post deleted", STATUS_INTERNAL)
}

pub async fn history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rejection) => return rejected_query(&rejection),
    };

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(state.config.default_page_limit);
    from_page(state.board.list_page(offset, limit).await, false)
}

pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rejection) => return rejected_query(&rejection),
    };

    let field: SearchField = match params.field.parse() {
        Ok(f) => f,
        Err(e) => return invalid(e.to_string()),
    };
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(state.config.default_page_limit);

    let outcome = state
        .board
        .search(field, &params.pattern, offset, limit)
        .await;
    from_page(outcome, true)
}

pub async fn detail(
    State(state): State<AppState>,
    params: Result<Query<DetailParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rejection) => return rejected_query(&rejection),
    };

    let outcome = state.board.get_post(params.id).await;
    from_outcome(outcome, StatusCode::OK, "Lookup complete", STATUS_INTERNAL)
}

pub async fn add_comment(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: Result<Json<AddCommentRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejected_json(&rejection),
    };

    let outcome = state
        .board
        .add_comment(req.post_id, &user.username, &req.content)
        .await;
    from_outcome(outcome, StatusCode::CREATED, "Comment added", STATUS_INTERNAL)
}
