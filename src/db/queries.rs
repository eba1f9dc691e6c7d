use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{Comment, NewPost, Post, SearchField, Session, User};

/// Thread ordering: newest root first, each root followed by its replies in
/// arrival order. `id` breaks any remaining tie so paging is deterministic.
const THREAD_ORDER: &str = r"
    ORDER BY CASE WHEN parent_ref = 0 THEN id ELSE parent_ref END DESC,
             sequence ASC,
             id ASC
";

fn now_rfc3339() -> String {
    super::format_timestamp(chrono::Utc::now())
}

// ========== Posts ==========

/// Get a post by ID.
pub async fn get_post(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post")
}

/// Insert a top-level post. Roots carry `parent_ref = 0` and `sequence = 0`
/// so they sort ahead of their replies.
pub async fn insert_post(pool: &SqlitePool, post: &NewPost) -> Result<Post> {
    let now = now_rfc3339();
    let result = sqlx::query(
        r"
        INSERT INTO posts (author, title, body, parent_ref, sequence, created_at, updated_at)
        VALUES (?, ?, ?, 0, 0, ?, ?)
        ",
    )
    .bind(&post.author)
    .bind(&post.title)
    .bind(&post.body)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .context("Failed to insert post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        author: post.author.clone(),
        title: post.title.clone(),
        body: post.body.clone(),
        parent_ref: 0,
        sequence: 0,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Insert a reply under `root_id`.
///
/// The sequence comes from a per-root counter bumped by a single upsert, so
/// two writers can never observe the same value. The first bump seeds the
/// counter past the highest sequence already stored under the root.
pub async fn insert_reply(pool: &SqlitePool, root_id: i64, post: &NewPost) -> Result<Post> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let (sequence,): (i64,) = sqlx::query_as(
        r"
        INSERT INTO thread_counters (parent_ref, last_sequence)
        VALUES (?, (SELECT COALESCE(MAX(sequence), 0) FROM posts WHERE parent_ref = ?) + 1)
        ON CONFLICT(parent_ref) DO UPDATE SET last_sequence = last_sequence + 1
        RETURNING last_sequence
        ",
    )
    .bind(root_id)
    .bind(root_id)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to allocate reply sequence")?;

    let now = now_rfc3339();
    let result = sqlx::query(
        r"
        INSERT INTO posts (author, title, body, parent_ref, sequence, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(&post.author)
    .bind(&post.title)
    .bind(&post.body)
    .bind(root_id)
    .bind(sequence)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await
    .context("Failed to insert reply")?;

    tx.commit().await.context("Failed to commit reply")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        author: post.author.clone(),
        title: post.title.clone(),
        body: post.body.clone(),
        parent_ref: root_id,
        sequence,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Replace a post's title and body. Returns `false` if no such post exists.
pub async fn update_post(pool: &SqlitePool, id: i64, title: &str, body: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE posts SET title = ?, body = ?, updated_at = ? WHERE id = ?")
        .bind(title)
        .bind(body)
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update post")?;
    Ok(result.rows_affected() > 0)
}

/// Delete exactly one post. Replies filed under it are left in place.
pub async fn delete_post(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;
    Ok(result.rows_affected())
}

/// Delete a root post together with every reply filed under it.
pub async fn delete_thread(pool: &SqlitePool, root_id: i64) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let replies = sqlx::query("DELETE FROM posts WHERE parent_ref = ?")
        .bind(root_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete thread replies")?;

    let root = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(root_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete thread root")?;

    sqlx::query("DELETE FROM thread_counters WHERE parent_ref = ?")
        .bind(root_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete thread counter")?;

    tx.commit().await.context("Failed to commit thread delete")?;
    Ok(root.rows_affected() + replies.rows_affected())
}

/// Get one window of all posts in thread order.
pub async fn list_posts(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<Post>> {
    let sql = format!("SELECT * FROM posts {THREAD_ORDER} LIMIT ? OFFSET ?");
    sqlx::query_as(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")
}

/// Count all posts, roots and replies alike.
pub async fn count_posts(pool: &SqlitePool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;
    Ok(row.0)
}

/// Get one window of posts whose `field` contains `pattern`, in thread order.
///
/// `instr` keeps the match a literal, case-sensitive substring test; the
/// column name comes from [`SearchField`] and never from the caller.
pub async fn search_posts(
    pool: &SqlitePool,
    field: SearchField,
    pattern: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let sql = format!(
        "SELECT * FROM posts WHERE instr({}, ?) > 0 {THREAD_ORDER} LIMIT ? OFFSET ?",
        field.column()
    );
    sqlx::query_as(&sql)
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to search posts")
}

/// Count posts whose `field` contains `pattern`.
pub async fn count_search_posts(pool: &SqlitePool, field: SearchField, pattern: &str) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM posts WHERE instr({}, ?) > 0",
        field.column()
    );
    let row: (i64,) = sqlx::query_as(&sql)
        .bind(pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count search results")?;
    Ok(row.0)
}

// ========== Comments ==========

/// Attach a comment to a post.
pub async fn insert_comment(
    pool: &SqlitePool,
    post_id: i64,
    author: &str,
    content: &str,
) -> Result<Comment> {
    let now = now_rfc3339();
    let result = sqlx::query(
        r"
        INSERT INTO comments (post_id, author, content, created_at)
        VALUES (?, ?, ?, ?)
        ",
    )
    .bind(post_id)
    .bind(author)
    .bind(content)
    .bind(&now)
    .execute(pool)
    .await
    .context("Failed to insert comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        post_id,
        author: author.to_string(),
        content: content.to_string(),
        created_at: now,
    })
}

/// Get all comments on a post, oldest first.
pub async fn get_comments_for_post(pool: &SqlitePool, post_id: i64) -> Result<Vec<Comment>> {
    sqlx::query_as("SELECT * FROM comments WHERE post_id = ? ORDER BY created_at ASC, id ASC")
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to get comments for post")
}

// ========== Users ==========

/// Get a user by ID.
pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch user by id")
}

/// Get a user by username.
pub async fn get_user_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch user by username")
}

/// Check if a username already exists.
pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await
        .context("Failed to check username existence")?;
    Ok(row.0 > 0)
}

/// Create a new user.
pub async fn create_user(pool: &SqlitePool, username: &str, password_hash: &str) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO users (username, password_hash, created_at)
        VALUES (?, ?, ?)
        ",
    )
    .bind(username)
    .bind(password_hash)
    .bind(now_rfc3339())
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(result.last_insert_rowid())
}

/// Count total users.
pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;
    Ok(row.0)
}

// ========== Sessions ==========

/// Create a new session.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    token: &str,
    expires_at: &str,
) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO sessions (user_id, token, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        ",
    )
    .bind(user_id)
    .bind(token)
    .bind(expires_at)
    .bind(now_rfc3339())
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(result.last_insert_rowid())
}

/// Get a session by token.
pub async fn get_session_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    sqlx::query_as("SELECT * FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch session by token")
}

/// Update session last_used_at.
pub async fn update_session_last_used(pool: &SqlitePool, session_id: i64) -> Result<()> {
    sqlx::query("UPDATE sessions SET last_used_at = ? WHERE id = ?")
        .bind(now_rfc3339())
        .bind(session_id)
        .execute(pool)
        .await
        .context("Failed to update session last_used")?;
    Ok(())
}

/// Delete a session.
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to delete session")?;
    Ok(())
}

/// Delete sessions whose expiry is before `now` (RFC 3339, UTC).
pub async fn delete_expired_sessions(pool: &SqlitePool, now: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;
    Ok(result.rows_affected())
}
