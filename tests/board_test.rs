//! Integration tests for board operations: reply sequencing, thread ordering,
//! pagination and the rest of the post lifecycle.

use bulletin_board::board::{BoardService, Outcome};
use bulletin_board::config::{Config, OrphanPolicy};
use bulletin_board::db::{Database, Post, SearchField};
use tempfile::TempDir;

async fn setup_board(orphan_policy: OrphanPolicy) -> (BoardService, Database, TempDir) {
    setup_board_with(Config {
        orphan_policy,
        ..Config::default()
    })
    .await
}

async fn setup_board_with(config: Config) -> (BoardService, Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (BoardService::new(db.clone(), &config), db, temp_dir)
}

async fn post(board: &BoardService, title: &str) -> Post {
    board
        .create_post("alice", title, "body text")
        .await
        .success()
        .expect("Failed to create post")
}

async fn reply(board: &BoardService, parent_id: i64, title: &str) -> Post {
    board
        .create_reply(parent_id, "bob", title, "reply text")
        .await
        .success()
        .expect("Failed to create reply")
}

fn ids(rows: &[Post]) -> Vec<i64> {
    rows.iter().map(|p| p.id).collect()
}

#[tokio::test]
async fn test_reply_sequences_start_at_one_and_never_skip() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let root = post(&board, "root").await;

    assert_eq!(root.parent_ref, 0);
    assert_eq!(root.sequence, 0);

    for expected in 1..=5 {
        let r = reply(&board, root.id, "re").await;
        assert_eq!(r.parent_ref, root.id);
        assert_eq!(r.sequence, expected);
    }
}

#[tokio::test]
async fn test_reply_sequence_continues_from_stored_replies() {
    let (board, db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let root = post(&board, "root").await;

    // Replies written without going through the counter, as an older
    // database would contain them, with a gap where one was deleted
    for sequence in [1, 3] {
        sqlx::query(
            "INSERT INTO posts (author, title, body, parent_ref, sequence, created_at, updated_at)
             VALUES ('bob', 're', 'old', ?, ?, '', '')",
        )
        .bind(root.id)
        .bind(sequence)
        .execute(db.pool())
        .await
        .expect("Failed to insert legacy reply");
    }

    let next = reply(&board, root.id, "re").await;
    assert_eq!(next.sequence, 4);
    let after = reply(&board, root.id, "re").await;
    assert_eq!(after.sequence, 5);
}

#[tokio::test]
async fn test_reply_to_reply_is_filed_under_root() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let root = post(&board, "root").await;
    let first = reply(&board, root.id, "first").await;

    let nested = reply(&board, first.id, "nested").await;
    assert_eq!(nested.parent_ref, root.id);
    assert_eq!(nested.sequence, 2);
}

#[tokio::test]
async fn test_reply_to_missing_parent_is_not_found() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;

    let outcome = board.create_reply(999, "bob", "re", "text").await;
    assert!(matches!(outcome, Outcome::NotFound(_)));
}

#[tokio::test]
async fn test_reply_with_missing_fields_is_rejected() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let root = post(&board, "root").await;

    let outcome = board.create_reply(root.id, "bob", "   ", "text").await;
    assert!(matches!(outcome, Outcome::ValidationFailure(_)));

    let outcome = board.create_reply(0, "bob", "re", "text").await;
    assert!(matches!(outcome, Outcome::ValidationFailure(_)));

    // Nothing was written
    let page = board.list_page(0, 10).await.success().unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_replies_get_distinct_sequences() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let root = post(&board, "root").await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let board = board.clone();
        tasks.spawn(async move {
            board
                .create_reply(root.id, "bob", &format!("re {i}"), "text")
                .await
                .success()
                .expect("Concurrent reply failed")
                .sequence
        });
    }

    let mut sequences = Vec::new();
    while let Some(result) = tasks.join_next().await {
        sequences.push(result.expect("Reply task panicked"));
    }
    sequences.sort_unstable();

    assert_eq!(sequences, (1..=16).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_threads_order_by_root_then_sequence() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let older = post(&board, "older").await;
    let newer = post(&board, "newer").await;
    let r1 = reply(&board, newer.id, "r1").await;
    let r2 = reply(&board, newer.id, "r2").await;

    let page = board.list_page(0, 10).await.success().unwrap();
    assert_eq!(ids(&page.rows), vec![newer.id, r1.id, r2.id, older.id]);
    assert_eq!(page.total, 4);

    // Replying to the older thread does not move it ahead
    let r3 = reply(&board, older.id, "r3").await;
    let page = board.list_page(0, 10).await.success().unwrap();
    assert_eq!(
        ids(&page.rows),
        vec![newer.id, r1.id, r2.id, older.id, r3.id]
    );
}

#[tokio::test]
async fn test_pagination_total_is_window_independent() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    for i in 0..4 {
        let root = post(&board, &format!("root {i}")).await;
        reply(&board, root.id, "re").await;
    }

    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let page = board.list_page(offset, 3).await.success().unwrap();
        assert_eq!(page.total, 8);
        if page.rows.is_empty() {
            break;
        }
        seen.extend(ids(&page.rows));
        offset += 3;
    }

    assert_eq!(seen.len(), 8);
    let full = board.list_page(0, 100).await.success().unwrap();
    assert_eq!(seen, ids(&full.rows));
}

#[tokio::test]
async fn test_limit_above_cap_is_rejected() {
    let (board, _db, _temp_dir) = setup_board_with(Config {
        max_page_limit: 5,
        ..Config::default()
    })
    .await;
    for i in 0..12 {
        post(&board, &format!("root {i}")).await;
    }

    assert!(matches!(
        board.list_page(0, 8).await,
        Outcome::ValidationFailure(_)
    ));
    assert!(matches!(
        board.search(SearchField::Title, "root", 0, 8).await,
        Outcome::ValidationFailure(_)
    ));

    // Paging at the cap still covers every row exactly once
    let mut seen = 0;
    let mut offset = 0;
    loop {
        let page = board.list_page(offset, 5).await.success().unwrap();
        assert_eq!(page.total, 12);
        if page.rows.is_empty() {
            break;
        }
        seen += page.rows.len();
        offset += 5;
    }
    assert_eq!(seen, 12);
}

#[tokio::test]
async fn test_bad_windows_rejected() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;

    assert!(matches!(
        board.list_page(-1, 10).await,
        Outcome::ValidationFailure(_)
    ));
    assert!(matches!(
        board.list_page(0, 0).await,
        Outcome::ValidationFailure(_)
    ));
}

#[tokio::test]
async fn test_empty_board_lists_nothing() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;

    let page = board.list_page(0, 10).await.success().unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.total, 0);

    // Past the end of a non-empty board
    post(&board, "only").await;
    let page = board.list_page(5, 10).await.success().unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_delete_missing_post_is_not_found_every_time() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let root = post(&board, "root").await;

    assert!(matches!(board.delete_post(root.id).await, Outcome::Success(1)));
    assert!(matches!(board.delete_post(root.id).await, Outcome::NotFound(_)));
    assert!(matches!(board.delete_post(root.id).await, Outcome::NotFound(_)));
    assert!(matches!(board.delete_post(424_242).await, Outcome::NotFound(_)));
}

#[tokio::test]
async fn test_delete_root_keeps_replies_by_default() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let root = post(&board, "root").await;
    let r1 = reply(&board, root.id, "r1").await;
    let r2 = reply(&board, root.id, "r2").await;

    assert!(matches!(board.delete_post(root.id).await, Outcome::Success(1)));

    // Orphans still list together under the deleted root's slot
    let page = board.list_page(0, 10).await.success().unwrap();
    assert_eq!(ids(&page.rows), vec![r1.id, r2.id]);
    assert!(page.rows.iter().all(|p| p.parent_ref == root.id));
}

#[tokio::test]
async fn test_delete_root_cascades_when_configured() {
    let (board, db, _temp_dir) = setup_board(OrphanPolicy::Cascade).await;
    let root = post(&board, "root").await;
    reply(&board, root.id, "r1").await;
    reply(&board, root.id, "r2").await;
    let other = post(&board, "other").await;

    assert!(matches!(board.delete_post(root.id).await, Outcome::Success(3)));

    let page = board.list_page(0, 10).await.success().unwrap();
    assert_eq!(ids(&page.rows), vec![other.id]);
    let (left,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE parent_ref = ?")
        .bind(root.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(left, 0);
}

#[tokio::test]
async fn test_delete_reply_leaves_thread() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Cascade).await;
    let root = post(&board, "root").await;
    let r1 = reply(&board, root.id, "r1").await;
    let r2 = reply(&board, root.id, "r2").await;

    assert!(matches!(board.delete_post(r1.id).await, Outcome::Success(1)));

    let page = board.list_page(0, 10).await.success().unwrap();
    assert_eq!(ids(&page.rows), vec![root.id, r2.id]);

    // Sequence numbers are never reused
    let r3 = reply(&board, root.id, "r3").await;
    assert_eq!(r3.sequence, 3);
}

#[tokio::test]
async fn test_search_matches_substring_in_chosen_field() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let a = board
        .create_post("alice", "Rust meetup", "Friday")
        .await
        .success()
        .unwrap();
    board
        .create_post("carol", "Gardening", "Rust on the tools")
        .await
        .success()
        .unwrap();
    let c = board
        .create_reply(a.id, "bob", "Re: Rust meetup", "count me in")
        .await
        .success()
        .unwrap();

    let page = board
        .search(SearchField::Title, "Rust", 0, 10)
        .await
        .success()
        .unwrap();
    assert_eq!(ids(&page.rows), vec![a.id, c.id]);
    assert_eq!(page.total, 2);

    // Window does not change the total
    let page = board
        .search(SearchField::Title, "Rust", 1, 1)
        .await
        .success()
        .unwrap();
    assert_eq!(ids(&page.rows), vec![c.id]);
    assert_eq!(page.total, 2);

    let page = board
        .search(SearchField::Author, "bob", 0, 10)
        .await
        .success()
        .unwrap();
    assert_eq!(ids(&page.rows), vec![c.id]);

    let page = board
        .search(SearchField::Body, "nothing like this", 0, 10)
        .await
        .success()
        .unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_search_pattern_is_literal() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    post(&board, "plain title").await;
    let odd = post(&board, "100% o'clock_").await;

    let page = board
        .search(SearchField::Title, "%", 0, 10)
        .await
        .success()
        .unwrap();
    assert_eq!(ids(&page.rows), vec![odd.id]);

    let page = board
        .search(SearchField::Title, "' OR 1=1 --", 0, 10)
        .await
        .success()
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_update_round_trip_keeps_position() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let root = post(&board, "root").await;
    let r = reply(&board, root.id, "before").await;

    let updated = board
        .update_post(r.id, "after", "new body")
        .await
        .success()
        .expect("Failed to update");
    assert_eq!(updated.title, "after");

    let detail = board.get_post(r.id).await.success().unwrap();
    assert_eq!(detail.post.id, r.id);
    assert_eq!(detail.post.title, "after");
    assert_eq!(detail.post.body, "new body");
    assert_eq!(detail.post.parent_ref, r.parent_ref);
    assert_eq!(detail.post.sequence, r.sequence);

    assert!(matches!(
        board.update_post(9999, "t", "b").await,
        Outcome::NotFound(_)
    ));
    assert!(matches!(
        board.update_post(r.id, "", "b").await,
        Outcome::ValidationFailure(_)
    ));
}

#[tokio::test]
async fn test_comments_load_with_post() {
    let (board, _db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let root = post(&board, "root").await;

    board.add_comment(root.id, "bob", "first").await.success().unwrap();
    board.add_comment(root.id, "carol", "second").await.success().unwrap();

    let detail = board.get_post(root.id).await.success().unwrap();
    let contents: Vec<&str> = detail.comments.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);

    assert!(matches!(
        board.add_comment(9999, "bob", "lost").await,
        Outcome::NotFound(_)
    ));
    assert!(matches!(board.get_post(9999).await, Outcome::NotFound(_)));
}

#[tokio::test]
async fn test_store_failure_is_reported_not_raised() {
    let (board, db, _temp_dir) = setup_board(OrphanPolicy::Keep).await;
    post(&board, "root").await;

    sqlx::query("DROP TABLE comments")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::query("DROP TABLE posts")
        .execute(db.pool())
        .await
        .unwrap();

    assert!(matches!(
        board.list_page(0, 10).await,
        Outcome::StoreFailure(_)
    ));
    assert!(matches!(
        board.create_post("alice", "t", "b").await,
        Outcome::StoreFailure(_)
    ));
}

#[tokio::test]
async fn test_open_leaves_no_counter_behind() {
    let (board, db, temp_dir) = setup_board(OrphanPolicy::Keep).await;
    let root = post(&board, "root").await;
    reply(&board, root.id, "re").await;

    // Reopening runs the write check again against a populated database
    drop(board);
    drop(db);
    let db = Database::new(&temp_dir.path().join("test.sqlite"))
        .await
        .expect("Failed to reopen database");

    let counters: Vec<(i64, i64)> =
        sqlx::query_as("SELECT parent_ref, last_sequence FROM thread_counters")
            .fetch_all(db.pool())
            .await
            .unwrap();
    assert_eq!(counters, vec![(root.id, 1)]);
}
