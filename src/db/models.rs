use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A board post. Top-level posts have `parent_ref == 0`; replies carry the id
/// of their thread's root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub author: String,
    pub title: String,
    pub body: String,
    pub parent_ref: i64,
    pub sequence: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Post {
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.parent_ref == 0
    }

    /// The id this post is grouped under when listing threads.
    #[must_use]
    pub const fn effective_root(&self) -> i64 {
        if self.parent_ref == 0 {
            self.id
        } else {
            self.parent_ref
        }
    }
}

/// Fields for inserting a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author: String,
    pub title: String,
    pub body: String,
}

/// A comment attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: String,
}

/// A post together with its comments, fetched by two explicit queries.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// One window of an ordered listing plus the size of the whole result set.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: i64,
}

/// A registered account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// A bearer session issued at login.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: String,
    pub created_at: String,
    pub last_used_at: Option<String>,
}

/// Columns a caller may search. Only these names ever reach query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Body,
    Author,
}

impl SearchField {
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Body => "body",
            Self::Author => "author",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported search field '{0}' (expected title, body or author)")]
pub struct UnknownSearchField(pub String);

impl FromStr for SearchField {
    type Err = UnknownSearchField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "body" | "content" => Ok(Self::Body),
            "author" | "writer" | "username" => Ok(Self::Author),
            other => Err(UnknownSearchField(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: i64, parent_ref: i64) -> Post {
        Post {
            id,
            author: "alice".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            parent_ref,
            sequence: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_effective_root() {
        assert_eq!(post(10, 0).effective_root(), 10);
        assert_eq!(post(21, 20).effective_root(), 20);
        assert!(post(10, 0).is_top_level());
        assert!(!post(21, 20).is_top_level());
    }

    #[test]
    fn test_search_field_parsing() {
        assert_eq!("title".parse::<SearchField>().unwrap(), SearchField::Title);
        assert_eq!("content".parse::<SearchField>().unwrap(), SearchField::Body);
        assert_eq!("writer".parse::<SearchField>().unwrap(), SearchField::Author);
        assert!("title; DROP TABLE posts".parse::<SearchField>().is_err());
        assert!("id".parse::<SearchField>().is_err());
    }
}
