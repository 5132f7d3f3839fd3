//! Error taxonomy for the store contract
//!
//! Every contract operation resolves with its result or fails with a
//! [StoreError]. The layer performs no retries and no silent recovery;
//! the one deliberate exception is `load_settings`, which fails open
//! (missing settings are an expected state, not an error).

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The persistent store could not be opened or upgraded. Fatal to the
    /// backend instance; the caller should fall back to the in-memory
    /// variant or abort.
    #[error("failed to open inventory store: {0}")]
    Initialization(#[source] sqlx::Error),

    /// A single read/write/delete was rejected by the underlying store.
    #[error("storage operation failed: {0}")]
    Storage(#[from] sqlx::Error),

    /// A bulk operation aborted at the named entry. Entries are applied
    /// sequentially, so attribution is deterministic. Whether earlier
    /// entries remain applied depends on the backend; see the bulk
    /// method docs.
    #[error("bulk operation aborted at entry {index} (item {id}): {source}")]
    BulkAborted {
        index: usize,
        id: Uuid,
        #[source]
        source: sqlx::Error,
    },

    /// A mutating call was made against a read-only store. No state was
    /// touched.
    #[error("store is read-only")]
    ReadOnly,

    /// Reserved. `remove` and `bulk_remove` of a missing id are no-ops by
    /// policy and never produce this.
    #[error("no item with id {0}")]
    NotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, StoreError>;
