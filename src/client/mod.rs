/// Remote store contracts consumed by the adapter.
///
/// The adapter never talks to a network client directly. It goes through
/// one of two contracts, matching the two access modes of the remote
/// service:
///
/// ```text
/// RawKvClient    get / put / delete / batch_put / batch_delete / scan
/// TxnKvClient    begin -> Transaction
///                  Transaction  get / set / delete / iter / snapshot / commit
///                  Cursor       valid / key / value / next / close
///                  Snapshot     get / exists
/// ```
///
/// Every call takes a [`CallContext`]. Implementations must fail with
/// `TimedOut` once its deadline has passed and with `Aborted` once it has
/// been cancelled.
///
/// `MemoryRawClient` and `MemoryTxnClient` are in-process implementations
/// used by tests, benches and `Database::open_in_memory`.
use crate::util::{CallContext, Result};

mod failpoint;
mod memory_raw;
mod memory_txn;

pub use failpoint::{FailPoint, FailPoints};
pub use memory_raw::MemoryRawClient;
pub use memory_txn::MemoryTxnClient;

/// Parallel key and value columns returned by one raw scan.
pub type ScanPage = (Vec<Vec<u8>>, Vec<Vec<u8>>);

/// Direct point and batch access, no transaction wrapping.
pub trait RawKvClient: Send + Sync {
    /// Returns `None` when the key is absent.
    fn get(&self, ctx: &CallContext, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, ctx: &CallContext, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, ctx: &CallContext, key: &[u8]) -> Result<()>;

    /// `keys` and `values` are parallel and must have the same length.
    fn batch_put(&self, ctx: &CallContext, keys: &[&[u8]], values: &[&[u8]]) -> Result<()>;

    fn batch_delete(&self, ctx: &CallContext, keys: &[&[u8]]) -> Result<()>;

    /// Up to `limit` entries with `start <= key < end`, in ascending key
    /// order. `end == None` means unbounded. A page may be shorter than
    /// `limit` while more keys remain; only an empty page means the range is
    /// drained.
    fn scan(
        &self,
        ctx: &CallContext,
        start: &[u8],
        end: Option<&[u8]>,
        limit: usize,
    ) -> Result<ScanPage>;

    fn close(&self) -> Result<()>;
}

/// Snapshot-isolated transactional access.
pub trait TxnKvClient: Send + Sync {
    /// Starts a transaction reading at a fresh snapshot.
    fn begin(&self, ctx: &CallContext) -> Result<Box<dyn Transaction>>;

    fn close(&self) -> Result<()>;
}

/// A transaction buffered on the client side and applied at commit.
///
/// Dropping a transaction without committing discards its writes.
pub trait Transaction: Send {
    /// Timestamp of the snapshot this transaction reads from.
    fn start_ts(&self) -> u64;

    /// Reads through the transaction's own writes first. A missing key is a
    /// `NotFound` error.
    fn get(&self, ctx: &CallContext, key: &[u8]) -> Result<Vec<u8>>;

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Opens a cursor over `lower <= key < upper` on the transaction's start
    /// snapshot, positioned at the first such key.
    fn iter(
        &self,
        ctx: &CallContext,
        lower: &[u8],
        upper: Option<&[u8]>,
    ) -> Result<Box<dyn Cursor>>;

    /// Read-only view of the start snapshot, ignoring this transaction's
    /// writes.
    fn snapshot(&self) -> Box<dyn Snapshot>;

    /// Applies every write or none of them.
    fn commit(self: Box<Self>, ctx: &CallContext) -> Result<()>;

    fn rollback(self: Box<Self>);
}

/// Read-only point lookups at a fixed timestamp.
pub trait Snapshot: Send + Sync {
    /// A missing key is a `NotFound` error.
    fn get(&self, ctx: &CallContext, key: &[u8]) -> Result<Vec<u8>>;

    /// Key-only read: whether `key` has a live value, without fetching it.
    fn exists(&self, ctx: &CallContext, key: &[u8]) -> Result<bool>;
}

/// Server-side forward cursor bound to one snapshot.
pub trait Cursor: Send {
    fn valid(&self) -> bool;

    /// Current key, empty when not valid.
    fn key(&self) -> &[u8];

    /// Current value, empty when not valid.
    fn value(&self) -> &[u8];

    fn next(&mut self) -> Result<()>;

    /// Releases the server-side cursor. Idempotent.
    fn close(&mut self);
}
