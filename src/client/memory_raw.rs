use std::{
    ops::Bound,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use crossbeam_skiplist::SkipMap;

use crate::{
    client::{FailPoint, FailPoints, RawKvClient, ScanPage},
    options::MAX_SCAN_LIMIT,
    util::{CallContext, Result, Status},
};

struct RawInner {
    map: SkipMap<Vec<u8>, Vec<u8>>,
    failpoints: FailPoints,
    closed: AtomicBool,
    scan_calls: AtomicU64,
    batch_put_calls: AtomicU64,
    batch_delete_calls: AtomicU64,
}

/// In-process raw-access client backed by a skiplist.
///
/// Clones share the same data, so a test can keep a handle for inspection
/// and fault injection after handing one to a `Database`.
#[derive(Clone)]
pub struct MemoryRawClient {
    inner: Arc<RawInner>,
}

impl MemoryRawClient {
    pub fn new() -> Self {
        MemoryRawClient {
            inner: Arc::new(RawInner {
                map: SkipMap::new(),
                failpoints: FailPoints::new(),
                closed: AtomicBool::new(false),
                scan_calls: AtomicU64::new(0),
                batch_put_calls: AtomicU64::new(0),
                batch_delete_calls: AtomicU64::new(0),
            }),
        }
    }

    pub fn failpoints(&self) -> &FailPoints {
        &self.inner.failpoints
    }

    pub fn len(&self) -> usize {
        self.inner.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.map.is_empty()
    }

    pub fn scan_calls(&self) -> u64 {
        self.inner.scan_calls.load(Ordering::Relaxed)
    }

    pub fn batch_put_calls(&self) -> u64 {
        self.inner.batch_put_calls.load(Ordering::Relaxed)
    }

    pub fn batch_delete_calls(&self) -> u64 {
        self.inner.batch_delete_calls.load(Ordering::Relaxed)
    }

    fn begin_call(&self, ctx: &CallContext, point: FailPoint) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(Status::shutdown_in_progress("raw client is closed"));
        }
        ctx.check()?;
        self.inner.failpoints.check(point)
    }
}

impl Default for MemoryRawClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RawKvClient for MemoryRawClient {
    #[tracing::instrument(level = "trace", skip_all)]
    fn get(&self, ctx: &CallContext, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.begin_call(ctx, FailPoint::Get)?;
        Ok(self.inner.map.get(key).map(|entry| entry.value().clone()))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn put(&self, ctx: &CallContext, key: &[u8], value: &[u8]) -> Result<()> {
        self.begin_call(ctx, FailPoint::Put)?;
        self.inner.map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn delete(&self, ctx: &CallContext, key: &[u8]) -> Result<()> {
        self.begin_call(ctx, FailPoint::Delete)?;
        self.inner.map.remove(key);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(keys = keys.len()))]
    fn batch_put(&self, ctx: &CallContext, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
        self.inner.batch_put_calls.fetch_add(1, Ordering::Relaxed);
        self.begin_call(ctx, FailPoint::BatchPut)?;
        if keys.len() != values.len() {
            return Err(Status::invalid_argument(format!(
                "batch_put got {} keys and {} values",
                keys.len(),
                values.len()
            )));
        }
        for (key, value) in keys.iter().zip(values) {
            self.inner.map.insert(key.to_vec(), value.to_vec());
        }
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(keys = keys.len()))]
    fn batch_delete(&self, ctx: &CallContext, keys: &[&[u8]]) -> Result<()> {
        self.inner.batch_delete_calls.fetch_add(1, Ordering::Relaxed);
        self.begin_call(ctx, FailPoint::BatchDelete)?;
        for key in keys {
            self.inner.map.remove(*key);
        }
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(limit = limit))]
    fn scan(
        &self,
        ctx: &CallContext,
        start: &[u8],
        end: Option<&[u8]>,
        limit: usize,
    ) -> Result<ScanPage> {
        self.inner.scan_calls.fetch_add(1, Ordering::Relaxed);
        self.begin_call(ctx, FailPoint::Scan)?;
        if limit == 0 || limit > MAX_SCAN_LIMIT {
            return Err(Status::invalid_argument(format!(
                "scan limit {limit} out of range 1..={MAX_SCAN_LIMIT}"
            )));
        }

        let mut keys = Vec::new();
        let mut values = Vec::new();
        if end.is_some_and(|end| end <= start) {
            return Ok((keys, values));
        }

        let upper = match end {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        let range: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Included(start), upper);
        for entry in self.inner.map.range::<[u8], _>(range).take(limit) {
            keys.push(entry.key().clone());
            values.push(entry.value().clone());
        }
        Ok((keys, values))
    }

    fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }
}
