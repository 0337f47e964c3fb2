//! Database seam for the backfill
//!
//! The migrator only needs five primitives from the store: select a
//! collection, filter by field absence, stream the matches, update one
//! document by `_id`, and tear the connection down. `Connector` covers the
//! first, `BackfillTarget` the rest.

use async_trait::async_trait;
use backfill_common::{MigrationConfig, Result};
use bson::{Bson, Document as BsonDocument};
use futures::stream::BoxStream;

/// Lazily consumed stream of matching documents
pub type DocumentStream = BoxStream<'static, Result<BsonDocument>>;

/// A selected collection the backfill can read and update
#[async_trait]
pub trait BackfillTarget: Send + Sync {
    /// Open a server-side cursor over documents lacking `field`
    ///
    /// Documents are fetched on demand; implementations must not
    /// materialize the whole selection.
    async fn find_missing(&self, field: &str) -> Result<DocumentStream>;

    /// Set `field` to `value` on the document identified by `id`
    ///
    /// The write is unconditional; no check against the prior state.
    async fn set_field(&self, id: &Bson, field: &str, value: &Bson) -> Result<()>;

    /// Release the underlying connection
    async fn close(&self);
}

/// Opens a [`BackfillTarget`] for a validated configuration
#[async_trait]
pub trait Connector: Send + Sync {
    type Target: BackfillTarget;

    /// Connect and select the configured database and collection
    ///
    /// # Errors
    /// Returns `BackfillError::Connection` when the endpoint cannot be reached.
    async fn connect(&self, config: &MigrationConfig) -> Result<Self::Target>;
}
