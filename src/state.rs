//! Shared list of owned records for the signed-in session.
//!
//! The list is replaced wholesale or edited through [`CollectionState::update`],
//! which runs against the latest snapshot under the lock. Every change is
//! published on a `watch` channel so views can re-render.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::models::OwnedCard;

struct Inner {
    owned_cards: Vec<OwnedCard>,
    selected_card_id: Option<String>,
}

/// Cheaply cloneable handle to the session's collection state.
#[derive(Clone)]
pub struct CollectionState {
    inner: Arc<Mutex<Inner>>,
    publisher: Arc<watch::Sender<Vec<OwnedCard>>>,
}

impl Default for CollectionState {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl CollectionState {
    pub fn new(owned_cards: Vec<OwnedCard>) -> Self {
        let (publisher, _) = watch::channel(owned_cards.clone());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                owned_cards,
                selected_card_id: None,
            })),
            publisher: Arc::new(publisher),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic inside an update closure must not wedge the whole session.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the current list.
    pub fn owned_cards(&self) -> Vec<OwnedCard> {
        self.lock().owned_cards.clone()
    }

    /// The record for `card_id`, if one exists.
    pub fn find(&self, card_id: &str) -> Option<OwnedCard> {
        self.lock()
            .owned_cards
            .iter()
            .find(|row| row.card_id == card_id)
            .cloned()
    }

    /// Authoritative amount for `card_id`; zero when there is no record.
    pub fn amount_owned(&self, card_id: &str) -> u32 {
        self.find(card_id).map(|row| row.amount_owned).unwrap_or(0)
    }

    /// Replace the list and publish it.
    pub fn set_owned_cards(&self, owned_cards: Vec<OwnedCard>) {
        self.update(|list| *list = owned_cards);
    }

    /// Apply `f` to the freshest list and publish the result.
    ///
    /// The lock is held for the duration of `f`, so `f` must not block.
    pub fn update<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Vec<OwnedCard>) -> T,
    {
        let (result, snapshot) = {
            let mut inner = self.lock();
            let result = f(&mut inner.owned_cards);
            (result, inner.owned_cards.clone())
        };
        self.publisher.send_replace(snapshot);
        result
    }

    /// Insert `record`, or overwrite the existing record for the same card.
    pub fn upsert(&self, record: OwnedCard) {
        self.update(|list| upsert_into(list, record));
    }

    /// Receive every published list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<OwnedCard>> {
        self.publisher.subscribe()
    }

    pub fn select_card(&self, card_id: Option<String>) {
        self.lock().selected_card_id = card_id;
    }

    pub fn selected_card_id(&self) -> Option<String> {
        self.lock().selected_card_id.clone()
    }
}

/// Upsert keyed by `card_id`, keeping at most one row per card.
pub(crate) fn upsert_into(list: &mut Vec<OwnedCard>, record: OwnedCard) {
    match list.iter_mut().find(|row| row.card_id == record.card_id) {
        Some(existing) => *existing = record,
        None => list.push(record),
    }
}
