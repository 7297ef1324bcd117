//! SDK builder wiring against the mock store.

mod common;

use card_collection_sdk::{CollectionError, CollectionSdk, RetryPolicy, User};
use common::{owned, settle, MockStore, EMAIL};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn build_rejects_empty_endpoint() {
    let err = CollectionSdk::builder()
        .endpoint("  ")
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, CollectionError::InvalidArgument(_)));
}

#[test]
fn display_shows_target_collection() {
    let sdk = CollectionSdk::builder()
        .endpoint("https://db.example.com/v1")
        .database("db")
        .collection("owned")
        .debounce(Duration::from_millis(300))
        .build()
        .unwrap();
    let shown = sdk.to_string();
    assert!(shown.contains("endpoint=https://db.example.com/v1"));
    assert!(shown.contains("debounce=300ms"));
    assert_eq!(sdk.cards().debounce(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn built_sdk_syncs_through_store() {
    let store = Arc::new(MockStore::with_documents(&[owned("doc-1", "A", 1)]));
    let sdk = CollectionSdk::builder()
        .user(User::new(EMAIL))
        .owned_cards(vec![owned("doc-1", "A", 1)])
        .build_with_store(Arc::clone(&store));

    assert!(sdk.session().user().is_some());
    sdk.cards().increment("A").unwrap();
    sdk.cards().increment("B").unwrap();
    settle().await;

    assert_eq!(store.updates(), vec![("doc-1".to_string(), 2)]);
    assert_eq!(store.creates().len(), 1);
    assert_eq!(sdk.state().owned_cards().len(), 2);
    assert!(sdk.cards().is_owned("B"));
}

#[test]
fn oversized_debounce_saturates_instead_of_wrapping() {
    let sdk = CollectionSdk::builder()
        .debounce(Duration::MAX)
        .build_with_store(MockStore::new());
    assert_eq!(sdk.config().debounce_ms, u64::MAX);
    assert_eq!(sdk.cards().debounce(), Duration::from_millis(u64::MAX));
}

#[test]
fn builder_retry_policy_reaches_synchronizer() {
    let retry = RetryPolicy {
        max_attempts: 7,
        base_delay: Duration::from_millis(40),
    };
    let sdk = CollectionSdk::builder()
        .retry(retry)
        .build_with_store(MockStore::new());
    assert_eq!(sdk.cards().retry_policy(), retry);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_applies_while_store_is_shared() {
    let store = Arc::new(MockStore::with_documents(&[owned("doc-1", "A", 1)]));
    // The synchronizer is shared before the policy is set.
    let sdk = Arc::new(
        CollectionSdk::builder()
            .user(User::new(EMAIL))
            .owned_cards(vec![owned("doc-1", "A", 1)])
            .build_with_store(Arc::clone(&store)),
    );
    let other = Arc::clone(&sdk);
    other.cards().set_retry(RetryPolicy::none());

    store.fail_next(1);
    sdk.cards().increment("A").unwrap();
    settle().await;

    assert_eq!(store.updates().len(), 1);
    assert!(sdk.cards().last_error("A").is_some());
    assert_eq!(sdk.cards().displayed_amount("A"), 1);
}
