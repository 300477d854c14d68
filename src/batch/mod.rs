/// Write batches for RemoteKV
///
/// A batch buffers Put/Delete operations in memory and flushes them to the
/// remote service on [`Batch::write`]. Both backends share one buffer
/// ([`BatchBuffer`]) and differ only in how the resolved operations reach
/// the service:
///
/// ```text
/// put/delete ──> BatchBuffer (insertion order, size accounting)
///                    │ write()
///                    ▼
///               Resolved (last write wins per key)
///                 ├─ delete keys ─┐
///                 └─ put keys ────┤
///                                 ▼
///   RawBatch:  batch_delete(...) then batch_put(...)     (not atomic)
///   TxnBatch:  begin; delete...; set...; commit           (atomic)
/// ```
///
/// ## Failure semantics
///
/// A `RawBatch` issues two independent remote calls. If the put call fails
/// after the delete call succeeded, the deletes stay applied and the caller
/// only sees the put error. A `TxnBatch` either commits everything or
/// nothing.
///
/// `write` does not clear the buffer; call [`Batch::reset`] to reuse it.
use crate::{
    db::KeyValueWriter,
    util::{CallContext, Result},
};

mod buffer;
mod raw_batch;
mod txn_batch;

pub use buffer::{BatchBuffer, Entry, Resolved};
pub use raw_batch::RawBatch;
pub use txn_batch::TxnBatch;

/// Write-only buffer of changes that are committed to the store on `write`.
///
/// Put/delete never touch the remote service and only fail if the batch
/// implementation says so; the built-in batches never do.
pub trait Batch: KeyValueWriter + Send + Sync {
    /// Bytes submitted so far: value bytes for puts, key bytes for deletes,
    /// superseded operations included.
    fn value_size(&self) -> usize;

    /// Resolves and flushes the buffered operations with the batch's default
    /// call context.
    fn write(&self) -> Result<()>;

    /// Same as [`Batch::write`] with an explicit context.
    fn write_with(&self, ctx: &CallContext) -> Result<()>;

    /// Clears the buffered operations and the size counter.
    fn reset(&self);

    /// Re-applies every buffered operation, in the order it was issued, to
    /// `sink`. The first sink error stops the replay.
    fn replay(&self, sink: &dyn KeyValueWriter) -> Result<()>;

    /// Number of buffered operations.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
