use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::info;

use crate::{
    batch::Batch,
    client::{MemoryRawClient, MemoryTxnClient, RawKvClient, TxnKvClient},
    db::{KeyValueReader, KeyValueStore, KeyValueWriter, RawKvStore, TxnKvStore},
    iterator::KvIterator,
    options::{BackendMode, StoreOptions},
    statistics::Statistics,
    util::{CallContext, Result, Status},
};

/// Ordered key-value store over a remote raw or transactional service.
///
/// # Example
///
/// ```
/// use remotekv::{Database, KeyValueReader, KeyValueStore, KeyValueWriter, StoreOptions};
///
/// let db = Database::open_in_memory(StoreOptions::txn()).unwrap();
/// db.put(b"user/1", Some(b"alice".as_slice())).unwrap();
///
/// let batch = db.new_batch();
/// batch.put(b"user/2", Some(b"bob".as_slice())).unwrap();
/// batch.delete(b"user/1").unwrap();
/// batch.write().unwrap();
///
/// assert_eq!(db.get(b"user/1").unwrap(), None);
///
/// let mut iter = db.new_iterator(b"user/", b"").unwrap();
/// assert!(iter.next());
/// assert_eq!(iter.key(), b"user/2");
/// iter.release();
/// db.close().unwrap();
/// ```
pub struct Database {
    store: Box<dyn KeyValueStore>,
    options: StoreOptions,
    closed: AtomicBool,
}

impl Database {
    /// Opens a store on a fresh in-process reference service of the kind
    /// selected by `options.mode`.
    pub fn open_in_memory(options: StoreOptions) -> Result<Self> {
        match options.mode {
            BackendMode::Raw => Self::with_raw_client(Arc::new(MemoryRawClient::new()), options),
            BackendMode::Txn => Self::with_txn_client(Arc::new(MemoryTxnClient::new()), options),
        }
    }

    pub fn with_raw_client(client: Arc<dyn RawKvClient>, options: StoreOptions) -> Result<Self> {
        options.validate()?;
        let store = RawKvStore::new(client, &options);
        Ok(Self::from_store(Box::new(store), options))
    }

    pub fn with_txn_client(client: Arc<dyn TxnKvClient>, options: StoreOptions) -> Result<Self> {
        options.validate()?;
        let store = TxnKvStore::new(client, &options);
        Ok(Self::from_store(Box::new(store), options))
    }

    fn from_store(store: Box<dyn KeyValueStore>, options: StoreOptions) -> Self {
        info!(
            mode = ?options.mode,
            namespace = %options.namespace,
            scan_limit = options.scan_limit,
            "opened store"
        );
        Database {
            store,
            options,
            closed: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn mode(&self) -> BackendMode {
        self.options.mode
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Status::shutdown_in_progress("database is closed"));
        }
        Ok(())
    }
}

impl KeyValueReader for Database {
    fn has(&self, key: &[u8]) -> Result<bool> {
        self.ensure_open()?;
        self.store.has(key)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        self.store.get(key)
    }
}

impl KeyValueWriter for Database {
    fn put(&self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.ensure_open()?;
        self.store.put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.store.delete(key)
    }
}

impl KeyValueStore for Database {
    fn default_context(&self) -> CallContext {
        self.store.default_context()
    }

    fn has_with(&self, ctx: &CallContext, key: &[u8]) -> Result<bool> {
        self.ensure_open()?;
        self.store.has_with(ctx, key)
    }

    fn get_with(&self, ctx: &CallContext, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        self.store.get_with(ctx, key)
    }

    fn put_with(&self, ctx: &CallContext, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.ensure_open()?;
        self.store.put_with(ctx, key, value)
    }

    fn delete_with(&self, ctx: &CallContext, key: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.store.delete_with(ctx, key)
    }

    /// Batches created before `close` fail on `write` once the client is
    /// closed.
    fn new_batch(&self) -> Box<dyn Batch> {
        self.store.new_batch()
    }

    fn new_iterator(&self, prefix: &[u8], start: &[u8]) -> Result<Box<dyn KvIterator>> {
        self.ensure_open()?;
        self.store.new_iterator(prefix, start)
    }

    fn new_iterator_with(
        &self,
        ctx: &CallContext,
        prefix: &[u8],
        start: &[u8],
    ) -> Result<Box<dyn KvIterator>> {
        self.ensure_open()?;
        self.store.new_iterator_with(ctx, prefix, start)
    }

    fn statistics(&self) -> &Arc<Statistics> {
        self.store.statistics()
    }

    /// Closes the remote client. Closing again is a no-op.
    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(namespace = %self.options.namespace, "closing store");
        self.store.close()
    }

    fn compact(&self, start: &[u8], limit: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.store.compact(start, limit)
    }

    fn stat(&self, property: &str) -> Result<String> {
        self.store.stat(property)
    }
}
