//! Store contracts and the two backend implementations.
//!
//! [`Database`] is the entry point. It picks one [`KeyValueStore`]
//! implementation when it is built and forwards every call to it.

use std::sync::Arc;

use crate::{
    batch::Batch,
    iterator::KvIterator,
    statistics::Statistics,
    util::{CallContext, Result, Status},
};

mod database;
mod raw_store;
mod txn_store;

pub use database::Database;
pub use raw_store::RawKvStore;
pub use txn_store::TxnKvStore;

/// Property name accepted by [`KeyValueStore::stat`].
pub const STATS_PROPERTY: &str = "stats";

pub trait KeyValueReader {
    fn has(&self, key: &[u8]) -> Result<bool>;

    /// `Ok(None)` when the key is absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

pub trait KeyValueWriter {
    /// Stores `value` under `key`. `None` stores the one-byte sentinel
    /// `[0x00]`.
    fn put(&self, key: &[u8], value: Option<&[u8]>) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;
}

/// A store backed by a remote service.
///
/// The `*_with` methods run under a caller [`CallContext`], so its deadline
/// and cancel handle reach the remote calls. The plain
/// [`KeyValueReader`]/[`KeyValueWriter`] methods use
/// [`KeyValueStore::default_context`].
pub trait KeyValueStore: KeyValueReader + KeyValueWriter + Send + Sync {
    /// Context for calls made without one: the configured call timeout, or
    /// no deadline.
    fn default_context(&self) -> CallContext;

    fn has_with(&self, ctx: &CallContext, key: &[u8]) -> Result<bool>;

    fn get_with(&self, ctx: &CallContext, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put_with(&self, ctx: &CallContext, key: &[u8], value: Option<&[u8]>) -> Result<()>;

    fn delete_with(&self, ctx: &CallContext, key: &[u8]) -> Result<()>;

    fn new_batch(&self) -> Box<dyn Batch>;

    /// Iterates the keys starting with `prefix`, from `prefix ‖ start` on.
    fn new_iterator(&self, prefix: &[u8], start: &[u8]) -> Result<Box<dyn KvIterator>>;

    /// Same as [`KeyValueStore::new_iterator`], with every remote call the
    /// iterator makes bound to `ctx`.
    fn new_iterator_with(
        &self,
        ctx: &CallContext,
        prefix: &[u8],
        start: &[u8],
    ) -> Result<Box<dyn KvIterator>>;

    fn statistics(&self) -> &Arc<Statistics>;

    fn close(&self) -> Result<()>;

    /// Range compaction is the remote service's business.
    fn compact(&self, _start: &[u8], _limit: &[u8]) -> Result<()> {
        Ok(())
    }

    fn stat(&self, property: &str) -> Result<String> {
        if property == STATS_PROPERTY {
            Ok(self.statistics().report())
        } else {
            Err(Status::not_supported(format!("unknown property: {property}")))
        }
    }
}
