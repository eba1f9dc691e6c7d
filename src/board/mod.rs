//! Board posts, threaded replies and comments.
//!
//! Threads are one level deep: every reply is filed under its root's id
//! (`parent_ref`) with a per-root `sequence`. Listings order by the root id
//! descending and then by sequence, so a thread stays together and its
//! position is fixed by when the root was posted; replies never bump it.

mod outcome;
pub mod validate;

pub use outcome::Outcome;
pub(crate) use outcome::try_store;

use tracing::{debug, info};

use crate::config::{Config, OrphanPolicy};
use crate::db::{self, Comment, Database, Page, Post, PostDetail, SearchField};

/// Post, reply, listing and comment operations over the posts table.
#[derive(Debug, Clone)]
pub struct BoardService {
    db: Database,
    orphan_policy: OrphanPolicy,
    max_page_limit: i64,
}

impl BoardService {
    #[must_use]
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            db,
            orphan_policy: config.orphan_policy,
            max_page_limit: config.max_page_limit,
        }
    }

    /// Create a top-level post.
    pub async fn create_post(&self, author: &str, title: &str, body: &str) -> Outcome<Post> {
        let new_post = match validate::post_fields(author, title, body) {
            Ok(p) => p,
            Err(e) => return Outcome::invalid(e),
        };

        let post = try_store!("create_post", db::insert_post(self.db.pool(), &new_post).await);
        info!(post_id = post.id, author = %post.author, "Created post");
        Outcome::Success(post)
    }

    /// Create a reply to `parent_id`.
    ///
    /// A reply to a reply is filed under that reply's root, keeping threads
    /// one level deep.
    pub async fn create_reply(
        &self,
        parent_id: i64,
        author: &str,
        title: &str,
        body: &str,
    ) -> Outcome<Post> {
        let new_post = match validate::post_id(parent_id)
            .and_then(|_| validate::post_fields(author, title, body))
        {
            Ok(p) => p,
            Err(e) => return Outcome::invalid(e),
        };

        let parent = match try_store!("create_reply", db::get_post(self.db.pool(), parent_id).await)
        {
            Some(p) => p,
            None => return Outcome::not_found(format!("post {parent_id} does not exist")),
        };
        let root_id = parent.effective_root();

        let reply = try_store!(
            "create_reply",
            db::insert_reply(self.db.pool(), root_id, &new_post).await
        );
        info!(
            post_id = reply.id,
            parent_ref = reply.parent_ref,
            sequence = reply.sequence,
            "Created reply"
        );
        Outcome::Success(reply)
    }

    /// Replace the title and body of a post. `parent_ref` and `sequence` are
    /// never touched.
    pub async fn update_post(&self, id: i64, title: &str, body: &str) -> Outcome<Post> {
        let (title, body) = match validate::post_id(id).and_then(|_| validate::edit_fields(title, body))
        {
            Ok(fields) => fields,
            Err(e) => return Outcome::invalid(e),
        };

        let updated = try_store!(
            "update_post",
            db::update_post(self.db.pool(), id, &title, &body).await
        );
        if !updated {
            return Outcome::not_found(format!("post {id} does not exist"));
        }

        match try_store!("update_post", db::get_post(self.db.pool(), id).await) {
            Some(post) => {
                info!(post_id = id, "Updated post");
                Outcome::Success(post)
            }
            // Deleted between the update and the read
            None => Outcome::not_found(format!("post {id} does not exist")),
        }
    }

    /// Delete a post. Returns how many rows were removed, which is more than
    /// one only when deleting a root under [`OrphanPolicy::Cascade`].
    pub async fn delete_post(&self, id: i64) -> Outcome<u64> {
        if let Err(e) = validate::post_id(id) {
            return Outcome::invalid(e);
        }

        let post = match try_store!("delete_post", db::get_post(self.db.pool(), id).await) {
            Some(p) => p,
            None => return Outcome::not_found(format!("post {id} does not exist")),
        };

        let removed = if post.is_top_level() && self.orphan_policy == OrphanPolicy::Cascade {
            try_store!("delete_post", db::delete_thread(self.db.pool(), id).await)
        } else {
            try_store!("delete_post", db::delete_post(self.db.pool(), id).await)
        };

        if removed == 0 {
            return Outcome::not_found(format!("post {id} does not exist"));
        }
        info!(post_id = id, removed, policy = ?self.orphan_policy, "Deleted post");
        Outcome::Success(removed)
    }

    /// One window of every post in thread order, with the total row count.
    pub async fn list_page(&self, offset: i64, limit: i64) -> Outcome<Page<Post>> {
        let (offset, limit) = match validate::window(offset, limit, self.max_page_limit) {
            Ok(w) => w,
            Err(e) => return Outcome::invalid(e),
        };

        let rows = try_store!("list_page", db::list_posts(self.db.pool(), offset, limit).await);
        let total = try_store!("list_page", db::count_posts(self.db.pool()).await);
        debug!(offset, limit, returned = rows.len(), total, "Listed posts");
        Outcome::Success(Page { rows, total })
    }

    /// Like [`Self::list_page`], restricted to posts whose `field` contains
    /// `pattern`.
    pub async fn search(
        &self,
        field: SearchField,
        pattern: &str,
        offset: i64,
        limit: i64,
    ) -> Outcome<Page<Post>> {
        let (offset, limit) = match validate::window(offset, limit, self.max_page_limit) {
            Ok(w) => w,
            Err(e) => return Outcome::invalid(e),
        };

        let rows = try_store!(
            "search",
            db::search_posts(self.db.pool(), field, pattern, offset, limit).await
        );
        let total = try_store!(
            "search",
            db::count_search_posts(self.db.pool(), field, pattern).await
        );
        debug!(%field, offset, limit, total, "Searched posts");
        Outcome::Success(Page { rows, total })
    }

    /// A post and its comments.
    pub async fn get_post(&self, id: i64) -> Outcome<PostDetail> {
        if let Err(e) = validate::post_id(id) {
            return Outcome::invalid(e);
        }

        let post = match try_store!("get_post", db::get_post(self.db.pool(), id).await) {
            Some(p) => p,
            None => return Outcome::not_found(format!("post {id} does not exist")),
        };
        let comments = try_store!(
            "get_post",
            db::get_comments_for_post(self.db.pool(), id).await
        );
        Outcome::Success(PostDetail { post, comments })
    }

    pub async fn add_comment(&self, post_id: i64, author: &str, content: &str) -> Outcome<Comment> {
        let (author, content) = match validate::post_id(post_id)
            .and_then(|_| validate::comment_fields(author, content))
        {
            Ok(fields) => fields,
            Err(e) => return Outcome::invalid(e),
        };

        if try_store!("add_comment", db::get_post(self.db.pool(), post_id).await).is_none() {
            return Outcome::not_found(format!("post {post_id} does not exist"));
        }

        let comment = try_store!(
            "add_comment",
            db::insert_comment(self.db.pool(), post_id, &author, &content).await
        );
        info!(comment_id = comment.id, post_id, "Added comment");
        Outcome::Success(comment)
    }
}
