//! JSON envelope shared by every board and auth endpoint.
//!
//! Clients of the original board API branch on a numeric `status` carried in
//! the body, layered under the HTTP status. Those codes only exist here; the
//! service layer speaks [`Outcome`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::board::Outcome;
use crate::db::{Page, Post};

pub const STATUS_OK: u16 = 4000;
/// Referenced post missing, or a listing window came back empty.
pub const STATUS_NOT_FOUND: u16 = 4001;
pub const STATUS_INVALID: u16 = 4002;
pub const STATUS_BAD_CREDENTIALS: u16 = 4003;
pub const STATUS_INTERNAL: u16 = 4999;
/// Store failure while creating a post or reply.
pub const STATUS_CREATE_FAILED: u16 = 5000;

const INTERNAL_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl Envelope<()> {
    pub fn bare(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            total: None,
            result: None,
        }
    }
}

impl<T> Envelope<T> {
    pub fn with_result(status: u16, message: impl Into<String>, result: T) -> Self {
        Self {
            status,
            message: message.into(),
            total: None,
            result: Some(result),
        }
    }
}

/// Build a response from a status and envelope.
pub fn reply<T: Serialize>(code: StatusCode, envelope: Envelope<T>) -> Response {
    (code, Json(envelope)).into_response()
}

pub fn invalid(message: impl Into<String>) -> Response {
    reply(StatusCode::BAD_REQUEST, Envelope::bare(STATUS_INVALID, message))
}

pub fn internal_error() -> Response {
    reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        Envelope::bare(STATUS_INTERNAL, INTERNAL_MESSAGE),
    )
}

/// Render an outcome. `store_status` picks the domain code used when the
/// store fails, since creates report 5000 and everything else 4999.
pub fn from_outcome<T: Serialize>(
    outcome: Outcome<T>,
    success: StatusCode,
    message: &str,
    store_status: u16,
) -> Response {
    match outcome {
        Outcome::Success(value) => reply(success, Envelope::with_result(STATUS_OK, message, value)),
        Outcome::NotFound(msg) => reply(StatusCode::NOT_FOUND, Envelope::bare(STATUS_NOT_FOUND, msg)),
        Outcome::ValidationFailure(msg) => invalid(msg),
        Outcome::StoreFailure(_) => reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            Envelope::bare(store_status, INTERNAL_MESSAGE),
        ),
    }
}

/// Render a listing. An empty window is a normal 200 reply flagged with
/// [`STATUS_NOT_FOUND`] unless `empty_is_ok`; `total` is always reported.
pub fn from_page(outcome: Outcome<Page<Post>>, empty_is_ok: bool) -> Response {
    match outcome {
        Outcome::Success(Page { rows, total }) => {
            let (status, message) = if rows.is_empty() && !empty_is_ok {
                (STATUS_NOT_FOUND, "No posts found")
            } else {
                (STATUS_OK, "Lookup complete")
            };
            reply(
                StatusCode::OK,
                Envelope {
                    status,
                    message: message.to_string(),
                    total: Some(total),
                    result: Some(rows),
                },
            )
        }
        other => from_outcome(other, StatusCode::OK, "", STATUS_INTERNAL),
    }
}

/// Turn an extractor rejection into the same 4002 envelope as a failed check.
pub fn rejected_json(rejection: &JsonRejection) -> Response {
    invalid(rejection.body_text())
}

pub fn rejected_query(rejection: &QueryRejection) -> Response {
    invalid(rejection.body_text())
}
