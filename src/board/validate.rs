//! Input checks for board operations.

use thiserror::Error;

use crate::db::NewPost;

pub const MAX_AUTHOR_LEN: usize = 50;
pub const MAX_TITLE_LEN: usize = 50;
pub const MAX_BODY_LEN: usize = 1000;
pub const MAX_COMMENT_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} must be {expected}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
    },
    #[error("limit must be at most {max}")]
    LimitTooLarge { max: i64 },
}

fn required(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Validate and normalize the fields of a new post or reply.
pub fn post_fields(author: &str, title: &str, body: &str) -> Result<NewPost, ValidationError> {
    Ok(NewPost {
        author: required("author", author, MAX_AUTHOR_LEN)?,
        title: required("title", title, MAX_TITLE_LEN)?,
        body: required("body", body, MAX_BODY_LEN)?,
    })
}

/// Validate the editable fields of an existing post.
pub fn edit_fields(title: &str, body: &str) -> Result<(String, String), ValidationError> {
    Ok((
        required("title", title, MAX_TITLE_LEN)?,
        required("body", body, MAX_BODY_LEN)?,
    ))
}

pub fn comment_fields(author: &str, content: &str) -> Result<(String, String), ValidationError> {
    Ok((
        required("author", author, MAX_AUTHOR_LEN)?,
        required("content", content, MAX_COMMENT_LEN)?,
    ))
}

pub fn post_id(id: i64) -> Result<i64, ValidationError> {
    if id < 1 {
        return Err(ValidationError::OutOfRange {
            field: "id",
            expected: "a positive integer",
        });
    }
    Ok(id)
}

/// Validate a listing window. `limit` must lie in `1..=max_limit`; a larger
/// value is refused rather than shrunk so `offset += limit` paging stays exact.
pub fn window(offset: i64, limit: i64, max_limit: i64) -> Result<(i64, i64), ValidationError> {
    if offset < 0 {
        return Err(ValidationError::OutOfRange {
            field: "offset",
            expected: "zero or greater",
        });
    }
    if limit < 1 {
        return Err(ValidationError::OutOfRange {
            field: "limit",
            expected: "greater than zero",
        });
    }
    if limit > max_limit {
        return Err(ValidationError::LimitTooLarge { max: max_limit });
    }
    Ok((offset, limit))
}
