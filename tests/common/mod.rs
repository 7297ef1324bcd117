//! Shared test fixtures for the collection SDK integration tests.
//!
//! Provides `MockStore`, an in-memory `DocumentStore` that records every
//! call and can be told to fail, and `setup_sync()` which wires it to a
//! signed-in session.

#![allow(dead_code)]

use card_collection_sdk::{
    CollectionError, CollectionState, DocumentStore, NewOwnedCard, OwnedCard, QuantitySynchronizer,
    Result, RetryPolicy, Session, User,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const EMAIL: &str = "collector@example.com";
pub const DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create {
        document_id: String,
        data: NewOwnedCard,
    },
    Update {
        document_id: String,
        amount_owned: u32,
    },
}

/// How an injected failure behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Failure {
    /// Rejected with a 503 before anything is stored.
    #[default]
    Unavailable,
    /// The write is stored, then the response is lost (503).
    LostResponse,
    /// Rejected with the given status before anything is stored.
    Status(u16),
}

/// In-memory document store that logs calls.
///
/// `fail_next(n)` makes the next `n` calls fail with a 503;
/// `fail_next_with` picks the kind of failure. Creating an id that is
/// already stored is a 409, as on the real server.
#[derive(Default)]
pub struct MockStore {
    calls: Mutex<Vec<Call>>,
    documents: Mutex<HashMap<String, OwnedCard>>,
    failures: AtomicUsize,
    failure: Mutex<Failure>,
    latency: Mutex<Duration>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with existing records.
    pub fn with_documents(records: &[OwnedCard]) -> Self {
        let store = Self::default();
        {
            let mut docs = store.documents.lock().unwrap();
            for r in records {
                docs.insert(r.id.clone(), r.clone());
            }
        }
        store
    }

    pub fn fail_next(&self, n: usize) {
        self.fail_next_with(n, Failure::Unavailable);
    }

    pub fn fail_next_with(&self, n: usize, kind: Failure) {
        *self.failure.lock().unwrap() = kind;
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Every call takes `latency` between being received and being applied.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<NewOwnedCard> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create { data, .. } => Some(data),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<(String, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update {
                    document_id,
                    amount_owned,
                } => Some((document_id, amount_owned)),
                _ => None,
            })
            .collect()
    }

    pub fn document(&self, id: &str) -> Option<OwnedCard> {
        self.documents.lock().unwrap().get(id).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    fn take_failure(&self) -> Option<Failure> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining == 0 {
            return None;
        }
        self.failures.store(remaining - 1, Ordering::SeqCst);
        Some(*self.failure.lock().unwrap())
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn remote(status: u16) -> CollectionError {
    CollectionError::Remote {
        status,
        message: format!("status {status}"),
    }
}

impl DocumentStore for MockStore {
    async fn create_document(&self, document_id: String, data: NewOwnedCard) -> Result<OwnedCard> {
        self.calls.lock().unwrap().push(Call::Create {
            document_id: document_id.clone(),
            data: data.clone(),
        });
        self.delay().await;
        let failure = self.take_failure();
        match failure {
            Some(Failure::Unavailable) => return Err(remote(503)),
            Some(Failure::Status(status)) => return Err(remote(status)),
            _ => {}
        }
        let record = data.into_owned(document_id.clone());
        {
            let mut docs = self.documents.lock().unwrap();
            if docs.contains_key(&document_id) {
                return Err(remote(409));
            }
            docs.insert(document_id, record.clone());
        }
        if failure == Some(Failure::LostResponse) {
            return Err(remote(503));
        }
        Ok(record)
    }

    async fn update_document(&self, document_id: String, amount_owned: u32) -> Result<OwnedCard> {
        self.calls.lock().unwrap().push(Call::Update {
            document_id: document_id.clone(),
            amount_owned,
        });
        self.delay().await;
        let failure = self.take_failure();
        match failure {
            Some(Failure::Unavailable) => return Err(remote(503)),
            Some(Failure::Status(status)) => return Err(remote(status)),
            _ => {}
        }
        let record = {
            let mut docs = self.documents.lock().unwrap();
            let record = docs
                .get_mut(&document_id)
                .ok_or_else(|| CollectionError::NotFound(document_id.clone()))?;
            record.amount_owned = amount_owned;
            record.clone()
        };
        if failure == Some(Failure::LostResponse) {
            return Err(remote(503));
        }
        Ok(record)
    }
}

pub fn owned(id: &str, card_id: &str, amount_owned: u32) -> OwnedCard {
    OwnedCard {
        id: id.to_string(),
        email: EMAIL.to_string(),
        card_id: card_id.to_string(),
        amount_owned,
    }
}

/// Synchronizer over a shared `MockStore`, signed in as `EMAIL`, with the
/// given records both in the store and in the local list.
pub fn setup_sync(records: &[OwnedCard]) -> (QuantitySynchronizer<Arc<MockStore>>, Arc<MockStore>) {
    let store = Arc::new(MockStore::with_documents(records));
    let session = Arc::new(Session::signed_in(User::new(EMAIL)));
    let state = CollectionState::new(records.to_vec());
    let sync = QuantitySynchronizer::new(Arc::clone(&store), session, state)
        .with_debounce(DEBOUNCE)
        .with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        });
    (sync, store)
}

/// Sleep past the debounce window plus any retry backoff.
pub async fn settle() {
    tokio::time::sleep(DEBOUNCE + Duration::from_secs(5)).await;
}
