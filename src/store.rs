//! The remote document collection seen by the synchronizer.
//!
//! Only the two writes the synchronizer needs are part of the contract:
//! create a record under a caller-chosen id, and patch `amount_owned` on an
//! existing record. Listing, querying and deleting belong to whoever loads
//! the collection in the first place.

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{NewOwnedCard, OwnedCard};

/// A remote collection of [`OwnedCard`] documents.
///
/// Implementations must be shareable across tasks; the futures they return
/// are driven from spawned debounce tasks.
pub trait DocumentStore: Send + Sync + 'static {
    /// Create a record with the given id and field map, returning the
    /// record as stored.
    fn create_document(
        &self,
        document_id: String,
        data: NewOwnedCard,
    ) -> impl Future<Output = Result<OwnedCard>> + Send;

    /// Set `amount_owned` on an existing record, returning the record as
    /// stored.
    fn update_document(
        &self,
        document_id: String,
        amount_owned: u32,
    ) -> impl Future<Output = Result<OwnedCard>> + Send;
}

impl<S: DocumentStore> DocumentStore for Arc<S> {
    fn create_document(
        &self,
        document_id: String,
        data: NewOwnedCard,
    ) -> impl Future<Output = Result<OwnedCard>> + Send {
        (**self).create_document(document_id, data)
    }

    fn update_document(
        &self,
        document_id: String,
        amount_owned: u32,
    ) -> impl Future<Output = Result<OwnedCard>> + Send {
        (**self).update_document(document_id, amount_owned)
    }
}
