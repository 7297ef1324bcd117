//! Card collection SDK for Rust.
//!
//! Tracks how many copies of each card a signed-in user owns. Quantity edits
//! are applied locally at once and written to a hosted document store after
//! a short debounce, one record per user and card.
//!
//! # Quick start
//!
//! ```no_run
//! use card_collection_sdk::{CollectionSdk, User};
//!
//! # async fn example() -> card_collection_sdk::Result<()> {
//! let sdk = CollectionSdk::builder()
//!     .endpoint("https://cloud.appwrite.io/v1")
//!     .project("my-project")
//!     .build()?;
//!
//! sdk.session().set_user(User::new("me@example.com"));
//! sdk.cards().increment("OP01-001")?;
//!
//! // Set a whole page of cards at once
//! sdk.cards().update_multiple_cards(["OP01-002", "OP01-003"], 4).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod debounce;
pub mod error;
pub mod i18n;
pub mod models;
pub mod remote;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;

pub use config::ClientConfig;
pub use debounce::Debouncer;
pub use error::{CollectionError, Result};
pub use models::{Card, NewOwnedCard, OwnedCard, User};
pub use remote::RemoteStore;
pub use session::Session;
pub use state::CollectionState;
pub use store::DocumentStore;
pub use sync::{QuantitySynchronizer, RetryPolicy};

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CollectionSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`CollectionSdk`] instance.
///
/// Use [`CollectionSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](CollectionSdkBuilder::build) to create the SDK.
#[derive(Default)]
pub struct CollectionSdkBuilder {
    config: ClientConfig,
    jwt: Option<String>,
    retry: RetryPolicy,
    owned_cards: Vec<OwnedCard>,
    user: Option<User>,
}

impl CollectionSdkBuilder {
    /// Start from a configuration file instead of the defaults.
    pub fn from_config<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            config: ClientConfig::load(path)?,
            ..Self::default()
        })
    }

    /// Base URL of the REST API, e.g. `https://cloud.appwrite.io/v1`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.config.project_id = project_id.into();
        self
    }

    /// Authenticate with a server API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// Authenticate as a user with a session JWT.
    pub fn jwt(mut self, jwt: impl Into<String>) -> Self {
        self.jwt = Some(jwt.into());
        self
    }

    pub fn database(mut self, database_id: impl Into<String>) -> Self {
        self.config.database_id = database_id.into();
        self
    }

    pub fn collection(mut self, collection_id: impl Into<String>) -> Self {
        self.config.collection_id = collection_id.into();
        self
    }

    /// Quiet period after the last edit to a card before it is written.
    ///
    /// Defaults to one second.
    pub fn debounce(mut self, delay: Duration) -> Self {
        self.config.debounce_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the HTTP request timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs();
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Seed the collection with records already loaded for this user.
    pub fn owned_cards(mut self, owned_cards: Vec<OwnedCard>) -> Self {
        self.owned_cards = owned_cards;
        self
    }

    /// Start the session signed in.
    pub fn user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    /// Build the SDK with a [`RemoteStore`] for the configured endpoint.
    pub fn build(self) -> Result<CollectionSdk> {
        if self.config.endpoint.trim().is_empty() {
            return Err(CollectionError::InvalidArgument(
                "endpoint must not be empty".into(),
            ));
        }
        let mut store = RemoteStore::new(&self.config)?;
        if let Some(jwt) = self.jwt.clone() {
            store = store.with_jwt(jwt);
        }
        Ok(self.build_with_store(store))
    }

    /// Build the SDK around any [`DocumentStore`].
    pub fn build_with_store<S: DocumentStore>(self, store: S) -> CollectionSdk<S> {
        let session = Arc::new(match self.user {
            Some(user) => Session::signed_in(user),
            None => Session::new(),
        });
        let state = CollectionState::new(self.owned_cards);
        let cards = QuantitySynchronizer::new(store, session, state)
            .with_debounce(self.config.debounce())
            .with_retry(self.retry);
        CollectionSdk {
            config: self.config,
            cards,
        }
    }
}

// ---------------------------------------------------------------------------
// CollectionSdk
// ---------------------------------------------------------------------------

/// The main entry point for the SDK.
///
/// Owns the session, the shared collection state and the synchronizer that
/// writes quantity edits to the store.
pub struct CollectionSdk<S = RemoteStore> {
    config: ClientConfig,
    cards: QuantitySynchronizer<S>,
}

impl CollectionSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> CollectionSdkBuilder {
        CollectionSdkBuilder::default()
    }
}

impl<S: DocumentStore> CollectionSdk<S> {
    /// Quantity editing for individual cards and batches.
    pub fn cards(&self) -> &QuantitySynchronizer<S> {
        &self.cards
    }

    pub fn session(&self) -> &Arc<Session> {
        self.cards.session()
    }

    pub fn state(&self) -> &CollectionState {
        self.cards.state()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl<S> fmt::Display for CollectionSdk<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CollectionSdk(endpoint={}, database={}, collection={}, debounce={}ms)",
            self.config.endpoint,
            self.config.database_id,
            self.config.collection_id,
            self.config.debounce_ms
        )
    }
}
