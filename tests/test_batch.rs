//! Batch updates: sequential writes, single publication.

mod common;

use card_collection_sdk::{CollectionError, CollectionState, QuantitySynchronizer, Session};
use common::{owned, settle, setup_sync, MockStore};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn batch_creates_missing_and_updates_existing() {
    let (sync, store) = setup_sync(&[owned("doc-a", "A", 1)]);

    let written = sync
        .update_multiple_cards(["A", "B", "C"], 4)
        .await
        .unwrap();

    assert_eq!(written.len(), 3);
    assert_eq!(store.updates(), vec![("doc-a".to_string(), 4)]);
    let created: Vec<String> = store.creates().into_iter().map(|c| c.card_id).collect();
    assert_eq!(created, vec!["B".to_string(), "C".to_string()]);

    let list = sync.state().owned_cards();
    assert_eq!(list.len(), 3);
    assert!(list.iter().all(|r| r.amount_owned == 4));
}

#[tokio::test(start_paused = true)]
async fn batch_zero_updates_existing_but_creates_nothing() {
    let (sync, store) = setup_sync(&[owned("doc-a", "A", 3)]);

    let written = sync.update_multiple_cards(vec!["A", "B"], 0).await.unwrap();

    assert_eq!(written.len(), 1);
    assert_eq!(store.updates(), vec![("doc-a".to_string(), 0)]);
    assert!(store.creates().is_empty());
    assert_eq!(sync.state().owned_cards().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn batch_publishes_once() {
    let (sync, _store) = setup_sync(&[]);
    let mut rx = sync.state().subscribe();
    rx.borrow_and_update();

    sync.update_multiple_cards(["A", "B", "C"], 2)
        .await
        .unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().len(), 3);
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn batch_with_duplicate_ids_keeps_one_record() {
    let (sync, store) = setup_sync(&[]);

    sync.update_multiple_cards(["A", "A"], 2).await.unwrap();

    assert_eq!(store.creates().len(), 1);
    assert_eq!(store.updates().len(), 1);
    assert_eq!(sync.state().owned_cards().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn batch_cancels_pending_debounced_write() {
    let (sync, store) = setup_sync(&[owned("doc-a", "A", 1)]);

    sync.set_quantity("A", 9).unwrap();
    assert!(sync.pending("A"));
    sync.update_multiple_cards(["A"], 2).await.unwrap();
    assert!(!sync.pending("A"));
    settle().await;

    assert_eq!(store.updates(), vec![("doc-a".to_string(), 2)]);
    assert_eq!(sync.displayed_amount("A"), 2);
}

#[tokio::test(start_paused = true)]
async fn batch_failure_publishes_partial_progress() {
    // "B" is known locally but missing remotely, so its update fails.
    let (sync, store) = setup_sync(&[owned("doc-a", "A", 1)]);
    sync.state().upsert(owned("doc-missing", "B", 1));

    let err = sync
        .update_multiple_cards(["A", "B", "C"], 5)
        .await
        .unwrap_err();

    assert!(matches!(err, CollectionError::NotFound(_)));
    assert_eq!(store.calls().len(), 2);
    assert_eq!(sync.state().amount_owned("A"), 5);
    assert_eq!(sync.state().amount_owned("B"), 1);
    assert!(sync.state().find("C").is_none());
    assert!(sync.last_error("B").is_some());
}

#[tokio::test(start_paused = true)]
async fn batch_requires_user() {
    let store = Arc::new(MockStore::new());
    let session = Arc::new(Session::new());
    let sync = QuantitySynchronizer::new(
        Arc::clone(&store),
        Arc::clone(&session),
        CollectionState::default(),
    );

    let err = sync.update_multiple_cards(["A"], 1).await.unwrap_err();
    assert!(matches!(err, CollectionError::Unauthenticated));
    assert!(session.is_login_prompt_open());
    assert!(store.calls().is_empty());
}
