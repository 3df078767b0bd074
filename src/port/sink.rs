use tokio_util::sync::CancellationToken;

use super::BoxFuture;
use crate::error::WriteError;

/// Write seam between the batch workers and the columnar store.
///
/// Implementations must be safe for concurrent use: every worker of a signal
/// shares one sink.
pub trait RecordSink<T>: Send + Sync {
    /// Table this sink writes to. Used for counters and log fields.
    fn table(&self) -> &'static str;

    /// Append `batch` in input order and submit it as a single commit.
    ///
    /// An empty batch returns `Ok` without touching the store. When `cancel`
    /// fires mid-write the implementation returns [`WriteError::Cancelled`]
    /// without committing a partial batch.
    fn insert_batch<'a>(
        &'a self,
        batch: &'a [T],
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<(), WriteError>>;
}
