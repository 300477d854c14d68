use std::sync::Arc;

use crate::{
    batch::{Batch, RawBatch},
    client::RawKvClient,
    db::{KeyValueReader, KeyValueStore, KeyValueWriter},
    iterator::{KvIterator, RawIterator},
    options::StoreOptions,
    statistics::Statistics,
    util::{CallContext, Result, keys::value_or_sentinel},
};

/// Store backed by the raw-access API. Point calls map one-to-one to remote
/// calls.
pub struct RawKvStore {
    client: Arc<dyn RawKvClient>,
    options: StoreOptions,
    statistics: Arc<Statistics>,
}

impl RawKvStore {
    pub fn new(client: Arc<dyn RawKvClient>, options: &StoreOptions) -> Self {
        RawKvStore {
            client,
            options: options.clone(),
            statistics: Arc::new(Statistics::new()),
        }
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.statistics.record_error();
        }
        result
    }

    fn iterator(&self, prefix: &[u8], start: &[u8]) -> RawIterator {
        RawIterator::new(
            self.client.clone(),
            prefix,
            start,
            self.options.scan_limit,
            self.options.call_timeout(),
            self.statistics.clone(),
        )
    }
}

impl KeyValueReader for RawKvStore {
    fn has(&self, key: &[u8]) -> Result<bool> {
        self.has_with(&self.default_context(), key)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.get_with(&self.default_context(), key)
    }
}

impl KeyValueWriter for RawKvStore {
    fn put(&self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.put_with(&self.default_context(), key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.delete_with(&self.default_context(), key)
    }
}

impl KeyValueStore for RawKvStore {
    fn default_context(&self) -> CallContext {
        self.options.call_context()
    }

    fn has_with(&self, ctx: &CallContext, key: &[u8]) -> Result<bool> {
        Ok(self.get_with(ctx, key)?.is_some())
    }

    fn get_with(&self, ctx: &CallContext, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self.track(self.client.get(ctx, key))?;
        match &value {
            Some(v) => self.statistics.record_read(v.len() as u64),
            None => self.statistics.record_not_found(),
        }
        Ok(value)
    }

    fn put_with(&self, ctx: &CallContext, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        let stored = value_or_sentinel(value);
        self.track(self.client.put(ctx, key, &stored))?;
        self.statistics
            .record_write(value.map_or(0, <[u8]>::len) as u64);
        Ok(())
    }

    fn delete_with(&self, ctx: &CallContext, key: &[u8]) -> Result<()> {
        self.track(self.client.delete(ctx, key))?;
        self.statistics.record_delete();
        Ok(())
    }

    fn new_batch(&self) -> Box<dyn Batch> {
        Box::new(RawBatch::new(
            self.client.clone(),
            self.options.call_timeout(),
            self.statistics.clone(),
        ))
    }

    /// Each page request gets its own `call_timeout_ms` budget.
    fn new_iterator(&self, prefix: &[u8], start: &[u8]) -> Result<Box<dyn KvIterator>> {
        Ok(Box::new(self.iterator(prefix, start)))
    }

    fn new_iterator_with(
        &self,
        ctx: &CallContext,
        prefix: &[u8],
        start: &[u8],
    ) -> Result<Box<dyn KvIterator>> {
        Ok(Box::new(self.iterator(prefix, start).with_context(ctx.clone())))
    }

    fn statistics(&self) -> &Arc<Statistics> {
        &self.statistics
    }

    fn close(&self) -> Result<()> {
        self.client.close()
    }
}
