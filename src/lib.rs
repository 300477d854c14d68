pub mod batch;
pub mod client;
pub mod db;
pub mod iterator;
pub mod options;
pub mod statistics;
pub mod util;

pub use batch::{Batch, RawBatch, TxnBatch};
pub use client::{
    Cursor, FailPoint, FailPoints, MemoryRawClient, MemoryTxnClient, RawKvClient, Snapshot,
    Transaction, TxnKvClient,
};
pub use db::{Database, KeyValueReader, KeyValueStore, KeyValueWriter, RawKvStore, TxnKvStore};
pub use iterator::{KvIterator, RawIterator, TxnIterator};
pub use options::{BackendMode, MAX_SCAN_LIMIT, StoreOptions};
pub use statistics::Statistics;
pub use util::{CallContext, CancelHandle, Code, Result, Status};
