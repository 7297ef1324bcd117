//! Optimistic, debounced synchronization of owned-card quantities.
//!
//! Edits land in a local optimistic map right away, so the displayed amount
//! follows the user's clicks. The remote write for a card waits until edits
//! to that card have been quiet for the debounce delay, then either updates
//! the existing record or creates one. The shared list is reconciled from
//! the stored record on whatever the list looks like at that moment.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::config::DEFAULT_DEBOUNCE;
use crate::debounce::Debouncer;
use crate::error::{CollectionError, Result};
use crate::models::{NewOwnedCard, OwnedCard};
use crate::remote::unique_id;
use crate::session::Session;
use crate::state::{upsert_into, CollectionState};
use crate::store::DocumentStore;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How often a failed remote write is repeated before giving up.
///
/// Only transient failures are retried (see [`CollectionError::is_transient`]).
/// The delay doubles after every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before the attempt following attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    async fn run<F, Fut, T>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && e.is_transient() => {
                    let delay = self.backoff(attempt);
                    warn!("{what} failed (attempt {attempt}): {e}; retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Clamp a requested amount to the representable non-negative range.
pub fn clamp_amount(amount: i64) -> u32 {
    amount.clamp(0, u32::MAX as i64) as u32
}

// ---------------------------------------------------------------------------
// QuantitySynchronizer
// ---------------------------------------------------------------------------

struct Shared<S> {
    store: S,
    session: Arc<Session>,
    state: CollectionState,
    retry: Mutex<RetryPolicy>,
    optimistic: Mutex<HashMap<String, u32>>,
    errors: Mutex<HashMap<String, String>>,
    // One write per card at a time, in the order the writes were started.
    writers: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: DocumentStore> Shared<S> {
    fn retry(&self) -> RetryPolicy {
        *lock(&self.retry)
    }

    /// Wait until no other write for `card_id` is in flight.
    async fn claim(&self, card_id: &str) -> OwnedMutexGuard<()> {
        let writer = Arc::clone(lock(&self.writers).entry(card_id.to_string()).or_default());
        writer.lock_owned().await
    }

    /// Drop the optimistic amount for `card_id` if no newer edit replaced it.
    fn settle(&self, card_id: &str, amount: u32) {
        let mut optimistic = lock(&self.optimistic);
        if optimistic.get(card_id) == Some(&amount) {
            optimistic.remove(card_id);
        }
    }

    /// Write `amount` for `card_id`: update if a record exists, create if
    /// not and `amount` is positive, otherwise do nothing.
    ///
    /// The caller must hold the card's writer guard.
    async fn write(
        &self,
        card_id: &str,
        email: &str,
        amount: u32,
        existing: Option<OwnedCard>,
    ) -> Result<Option<OwnedCard>> {
        let retry = self.retry();
        match existing {
            Some(record) => {
                debug!("updating {} ({}) to {}", card_id, record.id, amount);
                let stored = retry
                    .run("update", || {
                        self.store.update_document(record.id.clone(), amount)
                    })
                    .await?;
                Ok(Some(stored))
            }
            None if amount > 0 => {
                debug!("adding new card {} with {}", card_id, amount);
                let document_id = unique_id();
                let data = NewOwnedCard {
                    email: email.to_string(),
                    card_id: card_id.to_string(),
                    amount_owned: amount,
                };
                let mut attempts = 0u32;
                let result = retry
                    .run("create", || {
                        attempts += 1;
                        self.store
                            .create_document(document_id.clone(), data.clone())
                    })
                    .await;
                match result {
                    Ok(stored) => Ok(Some(stored)),
                    // An earlier attempt reached the store but its response
                    // was lost; the id is ours.
                    Err(CollectionError::Remote { status: 409, .. }) if attempts > 1 => {
                        warn!("create for card {card_id} already applied as {document_id}");
                        Ok(Some(data.into_owned(document_id)))
                    }
                    Err(e) => Err(e),
                }
            }
            None => Ok(None),
        }
    }

    /// Body of a debounced write once its delay has elapsed.
    async fn commit(&self, card_id: String, email: String, amount: u32) {
        let _writer = self.claim(&card_id).await;
        // Read after the previous write for this card has landed.
        let existing = self.state.find(&card_id);
        match self.write(&card_id, &email, amount, existing).await {
            Ok(stored) => {
                if let Some(record) = stored {
                    self.state.update(|list| upsert_into(list, record));
                }
                lock(&self.errors).remove(&card_id);
                self.settle(&card_id, amount);
            }
            Err(e) => {
                error!("giving up on writing {amount} for card {card_id}: {e}");
                lock(&self.errors).insert(card_id.clone(), e.to_string());
                self.settle(&card_id, amount);
                // Re-publish so views fall back to the authoritative amount.
                self.state.update(|_| ());
            }
        }
    }
}

/// Per-card quantity editing backed by a [`DocumentStore`].
///
/// Writes for the same card never overlap: a settlement that fires while
/// the previous write for that card is still in flight waits for it, then
/// decides between create and update from the list as it is by then.
pub struct QuantitySynchronizer<S> {
    shared: Arc<Shared<S>>,
    debouncer: Debouncer<String>,
    delay: Duration,
}

impl<S: DocumentStore> QuantitySynchronizer<S> {
    /// Create a synchronizer with the default debounce delay and retry policy.
    pub fn new(store: S, session: Arc<Session>, state: CollectionState) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                session,
                state,
                retry: Mutex::new(RetryPolicy::default()),
                optimistic: Mutex::new(HashMap::new()),
                errors: Mutex::new(HashMap::new()),
                writers: Mutex::new(HashMap::new()),
            }),
            debouncer: Debouncer::new(),
            delay: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_retry(self, retry: RetryPolicy) -> Self {
        self.set_retry(retry);
        self
    }

    /// Replace the retry policy. Applies to every write started afterwards,
    /// including debounced writes already scheduled.
    pub fn set_retry(&self, retry: RetryPolicy) {
        *lock(&self.shared.retry) = retry;
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.shared.retry()
    }

    pub fn debounce(&self) -> Duration {
        self.delay
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.shared.session
    }

    pub fn state(&self) -> &CollectionState {
        &self.shared.state
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    // -- Reads ---------------------------------------------------------------

    /// The amount a quantity input should show: the latest local edit if
    /// it has not settled yet, otherwise the authoritative amount.
    pub fn displayed_amount(&self, card_id: &str) -> u32 {
        if let Some(amount) = lock(&self.shared.optimistic).get(card_id) {
            return *amount;
        }
        self.shared.state.amount_owned(card_id)
    }

    pub fn is_owned(&self, card_id: &str) -> bool {
        self.displayed_amount(card_id) > 0
    }

    /// Whether a write for `card_id` is waiting for its debounce delay.
    pub fn pending(&self, card_id: &str) -> bool {
        self.debouncer.is_pending(&card_id.to_string())
    }

    /// Message of the last abandoned write for `card_id`, cleared by the
    /// next successful one.
    pub fn last_error(&self, card_id: &str) -> Option<String> {
        lock(&self.shared.errors).get(card_id).cloned()
    }

    pub fn select_card(&self, card_id: impl Into<String>) {
        self.shared.state.select_card(Some(card_id.into()));
    }

    // -- Edits ---------------------------------------------------------------

    fn require_email(&self) -> Result<String> {
        match self.shared.session.email() {
            Some(email) => Ok(email),
            None => {
                self.shared.session.request_login();
                Err(CollectionError::Unauthenticated)
            }
        }
    }

    pub fn increment(&self, card_id: &str) -> Result<u32> {
        let email = self.require_email()?;
        let amount = self.displayed_amount(card_id).saturating_add(1);
        Ok(self.apply(card_id, email, amount))
    }

    pub fn decrement(&self, card_id: &str) -> Result<u32> {
        let email = self.require_email()?;
        let amount = self.displayed_amount(card_id).saturating_sub(1);
        Ok(self.apply(card_id, email, amount))
    }

    /// Set the amount directly. Negative amounts become zero.
    pub fn set_quantity(&self, card_id: &str, new_amount: i64) -> Result<u32> {
        let email = self.require_email()?;
        Ok(self.apply(card_id, email, clamp_amount(new_amount)))
    }

    /// Set the amount from a text field.
    ///
    /// An empty field means zero. Anything that is not a non-negative
    /// integer is ignored and returns `Ok(None)`.
    pub fn set_quantity_input(&self, card_id: &str, text: &str) -> Result<Option<u32>> {
        let text = text.trim();
        let value = if text.is_empty() {
            0
        } else {
            match text.parse::<i64>() {
                Ok(v) if v >= 0 => v,
                _ => return Ok(None),
            }
        };
        self.set_quantity(card_id, value).map(Some)
    }

    fn apply(&self, card_id: &str, email: String, amount: u32) -> u32 {
        lock(&self.shared.optimistic).insert(card_id.to_string(), amount);

        let shared = Arc::clone(&self.shared);
        let key = card_id.to_string();
        let task_card = key.clone();
        self.debouncer.schedule(key, self.delay, async move {
            shared.commit(task_card, email, amount).await;
        });
        amount
    }

    // -- Batch ---------------------------------------------------------------

    /// Set every card in `card_ids` to `new_amount`, one write at a time,
    /// and publish the list once at the end.
    ///
    /// Pending debounced writes for these cards are cancelled. If a write
    /// fails, the records written before it are still published and the
    /// error is returned.
    pub async fn update_multiple_cards<I, T>(
        &self,
        card_ids: I,
        new_amount: i64,
    ) -> Result<Vec<OwnedCard>>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let email = self.require_email()?;
        let amount = clamp_amount(new_amount);
        let mut working = self.shared.state.owned_cards();
        let mut written = Vec::new();
        let mut failure = None;

        for card_id in card_ids {
            let card_id: String = card_id.into();
            self.debouncer.cancel(&card_id);
            let _writer = self.shared.claim(&card_id).await;
            let existing = working
                .iter()
                .find(|row| row.card_id == card_id)
                .cloned()
                .or_else(|| self.shared.state.find(&card_id));
            match self.shared.write(&card_id, &email, amount, existing).await {
                Ok(stored) => {
                    if let Some(record) = stored {
                        upsert_into(&mut working, record.clone());
                        written.push(record);
                    }
                    lock(&self.shared.optimistic).remove(&card_id);
                    lock(&self.shared.errors).remove(&card_id);
                }
                Err(e) => {
                    error!("batch update stopped at card {card_id}: {e}");
                    lock(&self.shared.optimistic).remove(&card_id);
                    lock(&self.shared.errors).insert(card_id, e.to_string());
                    failure = Some(e);
                    break;
                }
            }
        }

        self.shared.state.update(|list| {
            for record in &written {
                upsert_into(list, record.clone());
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}
