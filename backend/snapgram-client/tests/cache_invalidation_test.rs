mod common;

use remote_store::{AccountService, InMemoryRemote, Operation};
use snapgram_client::{FeedQuery, NewPost, NewUser, PageOutcome, QueryKey, SignIn, UpdateUser};
use tokio_test::assert_ok;

use common::*;

fn list_calls(remote: &InMemoryRemote) -> usize {
    remote
        .calls()
        .iter()
        .filter(|call| call.operation == Operation::ListDocuments)
        .count()
}

#[tokio::test]
async fn test_recent_posts_are_served_from_cache() {
    let (app, remote) = test_app();
    seed_posts(&remote, 3, "u1");

    let first = app.posts.recent_posts().await.unwrap();
    let second = app.posts.recent_posts().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(list_calls(&remote), 1);
    assert!(app.cache().contains(&QueryKey::RecentPosts).await);
}

#[tokio::test]
async fn test_feed_pages_share_cache_with_post_writes() {
    let (app, remote) = test_app();
    seed_posts(&remote, 3, "u1");
    let first_page = QueryKey::InfinitePosts {
        query: FeedQuery::All,
        limit: 9,
        cursor: None,
    };

    let feed = app.home_feed();
    assert_eq!(feed.fetch_next_page().await.unwrap(), PageOutcome::Loaded(3));
    assert!(app.cache().contains(&first_page).await);

    let other = app.home_feed();
    assert_eq!(other.fetch_next_page().await.unwrap(), PageOutcome::Loaded(3));
    assert_eq!(list_calls(&remote), 1);

    assert_ok!(app.posts.delete_post("p02", "file-p02").await);
    assert!(!app.cache().contains(&first_page).await);

    feed.reset(FeedQuery::All);
    assert_eq!(feed.fetch_next_page().await.unwrap(), PageOutcome::Loaded(2));
    let ids: Vec<String> = feed.items().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["p01", "p00"]);
}

#[tokio::test]
async fn test_create_post_invalidates_post_lists() {
    let (app, remote) = test_app();
    seed_posts(&remote, 2, "u1");
    assert_eq!(app.posts.recent_posts().await.unwrap().len(), 2);
    assert_eq!(app.posts.user_posts("u1").await.unwrap().len(), 2);

    let created = assert_ok!(
        app.posts
            .create_post(NewPost {
                user_id: "u1".to_string(),
                caption: "a brand new post".to_string(),
                file: png("new.png"),
                location: "Oslo".to_string(),
                tags: String::new(),
            })
            .await
    );

    let recent = app.posts.recent_posts().await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].id, created.id);
    assert_eq!(app.posts.user_posts("u1").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_like_invalidates_cached_post() {
    let (app, remote) = test_app();
    seed_post(&remote, "p1", "u1", at(0));

    let post = app.posts.get_post("p1").await.unwrap().unwrap();
    assert!(post.likes.is_empty());

    let liked = assert_ok!(app.posts.toggle_like(&post, "u2").await);
    assert_eq!(liked.likes, vec!["u2"]);

    let reloaded = app.posts.get_post("p1").await.unwrap().unwrap();
    assert_eq!(reloaded.likes, vec!["u2"]);

    let unliked = assert_ok!(app.posts.toggle_like(&reloaded, "u2").await);
    assert!(unliked.likes.is_empty());
}

#[tokio::test]
async fn test_delete_post_invalidates_lookup() {
    let (app, remote) = test_app();
    seed_post(&remote, "p1", "u1", at(0));
    assert!(app.posts.get_post("p1").await.unwrap().is_some());

    assert_ok!(app.posts.delete_post("p1", "file-p1").await);

    assert!(app.posts.get_post("p1").await.unwrap().is_none());
    assert!(app.posts.recent_posts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_saves_invalidate_saved_list() {
    let (app, remote) = test_app();
    seed_post(&remote, "p1", "u1", at(0));
    seed_post(&remote, "p2", "u1", at(1));

    assert!(app.saves.saved_posts("u9").await.unwrap().is_empty());

    let save = assert_ok!(app.saves.save_post("u9", "p2").await);
    let saved = app.saves.saved_posts("u9").await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, "p2");

    assert_ok!(app.saves.delete_saved_post(&save.id).await);
    assert!(app.saves.saved_posts("u9").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_profile_update_refreshes_current_user() {
    let (app, _remote) = test_app();
    let user = assert_ok!(
        app.auth
            .sign_up(NewUser {
                name: "Ada Lovelace".to_string(),
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                password: "analytical-engine".to_string(),
            })
            .await
    );
    assert_ok!(
        app.auth
            .sign_in(SignIn {
                email: "ada@example.com".to_string(),
                password: "analytical-engine".to_string(),
            })
            .await
    );
    assert_eq!(app.auth.current_user().await.unwrap().unwrap().bio, "");
    assert_eq!(app.users.get_users(None).await.unwrap().len(), 1);

    assert_ok!(
        app.users
            .update_user(UpdateUser {
                user_id: user.id.clone(),
                name: user.name.clone(),
                username: user.username.clone(),
                bio: "Poetical science".to_string(),
                image_url: user.image_url.clone(),
                image_id: None,
                file: None,
            })
            .await
    );

    let current = app.auth.current_user().await.unwrap().unwrap();
    assert_eq!(current.bio, "Poetical science");
    let listed = app.users.get_users(None).await.unwrap();
    assert_eq!(listed[0].bio, "Poetical science");
    let by_id = app.users.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.bio, "Poetical science");
}

#[tokio::test]
async fn test_sign_out_clears_cache() {
    let (app, remote) = test_app();
    seed_posts(&remote, 1, "u1");
    app.posts.recent_posts().await.unwrap();
    assert!(!app.cache().is_empty().await);

    remote
        .create_account("acc-1", "x@example.com", "password1", "X")
        .await
        .unwrap();
    remote
        .create_email_session("x@example.com", "password1")
        .await
        .unwrap();

    assert_ok!(app.auth.sign_out().await);
    assert!(app.cache().is_empty().await);
}
