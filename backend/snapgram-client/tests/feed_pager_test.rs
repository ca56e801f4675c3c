mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use remote_store::{Document, InMemoryRemote, Operation};
use snapgram_client::feed::DocumentPageSource;
use snapgram_client::{FeedPager, FeedQuery, PageOutcome, Post};

use common::*;

fn assert_strictly_ordered(items: &[Post]) {
    for pair in items.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            (a.created_at, &a.id) > (b.created_at, &b.id),
            "{} should come before {}",
            a.id,
            b.id
        );
    }
    let unique: HashSet<&str> = items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(unique.len(), items.len(), "duplicate ids in feed");
}

#[tokio::test]
async fn test_pages_merge_newest_first_until_end() {
    let (app, remote) = test_app();
    seed_posts(&remote, 20, "u1");
    let pager = app.home_feed();

    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::Loaded(9));
    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::Loaded(9));
    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::Loaded(2));
    assert!(pager.has_next_page());
    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::EndOfStream);
    assert!(!pager.has_next_page());

    let items = pager.items();
    assert_eq!(items.len(), 20);
    assert_eq!(items[0].id, "p19");
    assert_eq!(items[19].id, "p00");
    assert_strictly_ordered(&items);
    assert_eq!(pager.pages_loaded(), 3);
}

#[tokio::test]
async fn test_end_of_stream_is_sticky() {
    let (app, remote) = test_app();
    seed_posts(&remote, 3, "u1");
    let pager = app.home_feed();

    pager.fetch_pages(5).await.unwrap();
    assert!(!pager.has_next_page());
    remote.clear_calls();

    // New posts do not reopen the stream by themselves.
    seed_post(&remote, "late", "u1", at(100));
    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::EndOfStream);
    assert!(remote.calls().is_empty());
    assert_eq!(pager.len(), 3);
}

#[tokio::test]
async fn test_equal_timestamps_break_ties_by_id() {
    let remote = Arc::new(InMemoryRemote::new());
    for id in ["a", "b", "c", "d", "e"] {
        seed_post(&remote, id, "u1", at(0));
    }
    let pager: FeedPager<Post> = FeedPager::new(
        Arc::new(DocumentPageSource::<Post>::new(remote.clone(), POSTS)),
        FeedQuery::All,
        2,
    );
    pager.fetch_pages(10).await.unwrap();

    let ids: Vec<String> = pager.items().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["e", "d", "c", "b", "a"]);
}

#[tokio::test]
async fn test_failed_fetch_keeps_cursor_and_retry_resumes() {
    let (app, remote) = test_app();
    seed_posts(&remote, 12, "u1");
    let pager = app.home_feed();

    pager.fetch_next_page().await.unwrap();
    let cursor = pager.cursor();
    assert_eq!(cursor.as_deref(), Some("p03"));

    remote.fail_next(Operation::ListDocuments);
    assert!(pager.fetch_next_page().await.is_err());
    assert_eq!(pager.cursor(), cursor);
    assert!(pager.last_error().is_some());
    assert!(!pager.is_fetching());
    assert_eq!(pager.len(), 9);

    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::Loaded(3));
    assert!(pager.last_error().is_none());
    let items = pager.items();
    assert_eq!(items.len(), 12);
    assert_strictly_ordered(&items);
}

#[tokio::test]
async fn test_overlapping_pages_are_deduplicated() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(vec![post("p5", at(5)), post("p4", at(4)), post("p3", at(3))]),
        Ok(vec![post("p3", at(3)), post("p2", at(2))]),
    ]));
    let pager: FeedPager<Post> = FeedPager::new(source.clone(), FeedQuery::All, 3);

    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::Loaded(3));
    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::Loaded(1));
    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::EndOfStream);

    let ids: Vec<String> = pager.items().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["p5", "p4", "p3", "p2"]);
    assert_eq!(
        source.cursors(),
        vec![None, Some("p3".to_string()), Some("p2".to_string())]
    );
}

#[tokio::test]
async fn test_scripted_error_then_retry_uses_same_cursor() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(vec![post("p2", at(2))]),
        Err(page_error()),
        Ok(vec![post("p1", at(1))]),
    ]));
    let pager: FeedPager<Post> = FeedPager::new(source.clone(), FeedQuery::All, 1);

    pager.fetch_next_page().await.unwrap();
    assert!(pager.fetch_next_page().await.is_err());
    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::Loaded(1));

    assert_eq!(
        source.cursors(),
        vec![None, Some("p2".to_string()), Some("p2".to_string())]
    );
}

#[tokio::test]
async fn test_concurrent_fetch_is_suppressed() {
    let remote = Arc::new(InMemoryRemote::new());
    seed_posts(&remote, 5, "u1");
    let store = Arc::new(GatedStore::new(remote.clone()));
    let pager: FeedPager<Post> = FeedPager::new(
        Arc::new(DocumentPageSource::<Post>::new(store.clone(), POSTS)),
        FeedQuery::All,
        9,
    );

    let (first, second) = tokio::join!(pager.fetch_next_page(), async {
        while !pager.is_fetching() {
            tokio::task::yield_now().await;
        }
        let second = pager.fetch_next_page().await;
        store.release(1);
        second
    });

    assert_eq!(first.unwrap(), PageOutcome::Loaded(5));
    assert_eq!(second.unwrap(), PageOutcome::InFlight);
    assert_eq!(store.list_calls(), 1);
    assert!(!pager.is_fetching());
}

#[tokio::test]
async fn test_abandoned_fetch_releases_pager() {
    let remote = Arc::new(InMemoryRemote::new());
    seed_posts(&remote, 5, "u1");
    let store = Arc::new(GatedStore::new(remote.clone()));
    let pager: FeedPager<Post> = FeedPager::new(
        Arc::new(DocumentPageSource::<Post>::new(store.clone(), POSTS)),
        FeedQuery::All,
        9,
    );

    let timed_out = tokio::time::timeout(Duration::from_millis(10), pager.fetch_next_page()).await;
    assert!(timed_out.is_err());
    assert!(!pager.is_fetching());
    assert!(pager.cursor().is_none());

    store.release(1);
    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::Loaded(5));
    assert_eq!(store.list_calls(), 2);
}

#[tokio::test]
async fn test_deleted_cursor_posts_resume_from_previous_item() {
    let (app, remote) = test_app();
    seed_posts(&remote, 20, "u1");
    let pager = app.home_feed();

    pager.fetch_next_page().await.unwrap();
    assert_eq!(pager.cursor().as_deref(), Some("p11"));

    app.posts.delete_post("p11", "file-p11").await.unwrap();
    app.posts.delete_post("p12", "file-p12").await.unwrap();

    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::Loaded(9));
    assert!(pager.last_error().is_none());
    assert_eq!(pager.cursor().as_deref(), Some("p02"));

    pager.fetch_pages(5).await.unwrap();
    assert!(!pager.has_next_page());

    let items = pager.items();
    assert_eq!(items.len(), 18);
    assert!(items.iter().all(|p| p.id != "p11" && p.id != "p12"));
    assert_eq!(items[0].id, "p19");
    assert_eq!(items[17].id, "p00");
    assert_strictly_ordered(&items);
}

#[tokio::test]
async fn test_reset_discards_late_page() {
    let remote = Arc::new(InMemoryRemote::new());
    seed_posts(&remote, 4, "u1");
    seed_post(&remote, "other", "u2", at(50));
    let store = Arc::new(GatedStore::new(remote.clone()));
    let pager: FeedPager<Post> = FeedPager::new(
        Arc::new(DocumentPageSource::<Post>::new(store.clone(), POSTS)),
        FeedQuery::All,
        9,
    );

    let (outcome, _) = tokio::join!(pager.fetch_next_page(), async {
        while !pager.is_fetching() {
            tokio::task::yield_now().await;
        }
        pager.reset(FeedQuery::Creator("u2".to_string()));
        store.release(1);
    });

    assert_eq!(outcome.unwrap(), PageOutcome::Stale);
    assert!(pager.is_empty());
    assert!(!pager.is_fetching());

    store.release(1);
    assert_eq!(pager.fetch_next_page().await.unwrap(), PageOutcome::Loaded(1));
    let items = pager.items();
    assert_eq!(items[0].id, "other");
}

#[tokio::test]
async fn test_reset_reopens_stream() {
    let (app, remote) = test_app();
    seed_posts(&remote, 2, "u1");
    seed_post(&remote, "x1", "u2", at(10));
    let pager = app.home_feed();

    pager.fetch_pages(10).await.unwrap();
    assert!(!pager.has_next_page());
    assert_eq!(pager.len(), 3);

    pager.reset(FeedQuery::Creator("u1".to_string()));
    assert!(pager.has_next_page());
    assert!(pager.cursor().is_none());

    pager.fetch_pages(10).await.unwrap();
    let ids: Vec<String> = pager.items().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["p01", "p00"]);
}

#[tokio::test]
async fn test_search_feed_matches_caption() {
    let (app, remote) = test_app();
    seed_posts(&remote, 3, "u1");

    let pager = app.search_feed("P01");
    pager.fetch_pages(3).await.unwrap();

    let ids: Vec<String> = pager.items().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["p01"]);
}

#[tokio::test]
async fn test_users_feed_lists_newest_first() {
    let (app, remote) = test_app();
    seed_user(&remote, "u1", "acc-1", None);
    remote.seed_document(
        USERS,
        Document::new(
            "u2",
            at(5),
            serde_json::json!({
                "accountId": "acc-2",
                "name": "Alan",
                "username": "alan",
                "email": "alan@example.com",
                "imageUrl": "",
            }),
        ),
    );

    let pager = app.users_feed();
    pager.fetch_pages(2).await.unwrap();
    let ids: Vec<String> = pager.items().into_iter().map(|u| u.id).collect();
    assert_eq!(ids, vec!["u2", "u1"]);
}
