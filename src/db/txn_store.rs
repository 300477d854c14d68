use std::sync::Arc;

use crate::{
    batch::{Batch, TxnBatch},
    client::{Snapshot, TxnKvClient},
    db::{KeyValueReader, KeyValueStore, KeyValueWriter},
    iterator::{KvIterator, TxnIterator},
    options::StoreOptions,
    statistics::Statistics,
    util::{CallContext, Result, keys::value_or_sentinel},
};

/// Store backed by the transactional API.
///
/// Every point read runs on a fresh snapshot and every point write commits
/// its own transaction.
pub struct TxnKvStore {
    client: Arc<dyn TxnKvClient>,
    options: StoreOptions,
    statistics: Arc<Statistics>,
}

impl TxnKvStore {
    pub fn new(client: Arc<dyn TxnKvClient>, options: &StoreOptions) -> Self {
        TxnKvStore {
            client,
            options: options.clone(),
            statistics: Arc::new(Statistics::new()),
        }
    }

    /// Runs `op` on a fresh snapshot and rolls the transaction back.
    fn read<T>(&self, ctx: &CallContext, op: impl FnOnce(&dyn Snapshot) -> Result<T>) -> Result<T> {
        let txn = self.client.begin(ctx)?;
        let result = op(txn.snapshot().as_ref());
        txn.rollback();
        result
    }

    fn write_one(&self, ctx: &CallContext, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        let mut txn = self.client.begin(ctx)?;
        let staged = match value {
            Some(value) => txn.set(key, value),
            None => txn.delete(key),
        };
        if let Err(e) = staged {
            txn.rollback();
            return Err(e);
        }
        txn.commit(ctx)
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.statistics.record_error();
        }
        result
    }
}

impl KeyValueReader for TxnKvStore {
    fn has(&self, key: &[u8]) -> Result<bool> {
        self.has_with(&self.default_context(), key)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.get_with(&self.default_context(), key)
    }
}

impl KeyValueWriter for TxnKvStore {
    fn put(&self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.put_with(&self.default_context(), key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.delete_with(&self.default_context(), key)
    }
}

impl KeyValueStore for TxnKvStore {
    fn default_context(&self) -> CallContext {
        self.options.call_context()
    }

    /// Key-only lookup; the value never crosses the wire.
    fn has_with(&self, ctx: &CallContext, key: &[u8]) -> Result<bool> {
        let found = self.track(self.read(ctx, |snapshot| snapshot.exists(ctx, key)))?;
        if found {
            self.statistics.record_read(0);
        } else {
            self.statistics.record_not_found();
        }
        Ok(found)
    }

    fn get_with(&self, ctx: &CallContext, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self.track(self.read(ctx, |snapshot| match snapshot.get(ctx, key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }))?;
        match &value {
            Some(v) => self.statistics.record_read(v.len() as u64),
            None => self.statistics.record_not_found(),
        }
        Ok(value)
    }

    fn put_with(&self, ctx: &CallContext, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        let stored = value_or_sentinel(value);
        self.track(self.write_one(ctx, key, Some(stored.as_slice())))?;
        self.statistics
            .record_write(value.map_or(0, <[u8]>::len) as u64);
        Ok(())
    }

    fn delete_with(&self, ctx: &CallContext, key: &[u8]) -> Result<()> {
        self.track(self.write_one(ctx, key, None))?;
        self.statistics.record_delete();
        Ok(())
    }

    fn new_batch(&self) -> Box<dyn Batch> {
        Box::new(TxnBatch::new(
            self.client.clone(),
            self.options.call_timeout(),
            self.statistics.clone(),
        ))
    }

    fn new_iterator(&self, prefix: &[u8], start: &[u8]) -> Result<Box<dyn KvIterator>> {
        self.new_iterator_with(&self.default_context(), prefix, start)
    }

    /// `ctx` bounds opening the snapshot and cursor. Cursor steps run on the
    /// server-side cursor and take no context.
    fn new_iterator_with(
        &self,
        ctx: &CallContext,
        prefix: &[u8],
        start: &[u8],
    ) -> Result<Box<dyn KvIterator>> {
        let iter = self.track(TxnIterator::new(
            self.client.as_ref(),
            ctx,
            prefix,
            start,
            self.statistics.clone(),
        ))?;
        Ok(Box::new(iter))
    }

    fn statistics(&self) -> &Arc<Statistics> {
        &self.statistics
    }

    fn close(&self) -> Result<()> {
        self.client.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FailPoint, MemoryTxnClient};
    use crate::util::{Code, Status};

    fn store() -> (MemoryTxnClient, TxnKvStore) {
        let client = MemoryTxnClient::new();
        let store = TxnKvStore::new(Arc::new(client.clone()), &StoreOptions::txn());
        (client, store)
    }

    #[test]
    fn test_point_operations() {
        let (client, store) = store();
        assert_eq!(store.get(b"k").unwrap(), None);
        assert!(!store.has(b"k").unwrap());

        store.put(b"k", Some(b"v")).unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert!(store.has(b"k").unwrap());

        store.delete(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
        assert_eq!(client.commits(), 2);
    }

    #[test]
    fn test_put_without_value_stores_sentinel() {
        let (client, store) = store();
        store.put(b"k", None).unwrap();
        assert_eq!(client.peek(b"k"), Some(vec![0x00]));
        assert_eq!(store.get(b"k").unwrap(), Some(vec![0x00]));
    }

    #[test]
    fn test_commit_failure_is_reported() {
        let (client, store) = store();
        client
            .failpoints()
            .arm(FailPoint::Commit, Status::io_error("commit rejected"));
        assert!(store.put(b"k", Some(b"v")).is_err());
        assert_eq!(client.peek(b"k"), None);
        assert_eq!(store.statistics().num_errors(), 1);
    }

    #[test]
    fn test_iterator_construction_failure() {
        let (client, store) = store();
        client
            .failpoints()
            .arm(FailPoint::OpenCursor, Status::io_error("no cursor"));
        assert!(store.new_iterator(b"a", b"").is_err());
    }

    #[test]
    fn test_read_does_not_commit() {
        let (client, store) = store();
        store.put(b"k", Some(b"v")).unwrap();
        store.get(b"k").unwrap();
        store.has(b"missing").unwrap();
        assert_eq!(client.commits(), 1);
    }

    #[test]
    fn test_has_reads_no_value_bytes() {
        let (_, store) = store();
        store.put(b"k", Some(b"a large enough value")).unwrap();

        assert!(store.has(b"k").unwrap());
        assert!(!store.has(b"missing").unwrap());

        let stats = store.statistics();
        assert_eq!(stats.bytes_read(), 0);
        assert_eq!(stats.num_keys_read(), 2);
    }

    #[test]
    fn test_cancelled_context_aborts_point_calls() {
        let (client, store) = store();
        store.put(b"k", Some(b"v")).unwrap();

        let (ctx, cancel) = CallContext::background().cancellable();
        assert!(store.has_with(&ctx, b"k").unwrap());
        cancel.cancel();

        assert_eq!(store.get_with(&ctx, b"k").unwrap_err().code(), &Code::Aborted);
        assert_eq!(store.has_with(&ctx, b"k").unwrap_err().code(), &Code::Aborted);
        assert_eq!(
            store.put_with(&ctx, b"k", Some(b"w")).unwrap_err().code(),
            &Code::Aborted
        );
        assert_eq!(store.delete_with(&ctx, b"k").unwrap_err().code(), &Code::Aborted);
        assert!(store.new_iterator_with(&ctx, b"", b"").is_err());
        assert_eq!(client.peek(b"k"), Some(b"v".to_vec()));
        assert_eq!(client.commits(), 1);
    }
}
