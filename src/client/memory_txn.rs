use std::{
    cmp::Reverse,
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use crossbeam_skiplist::SkipMap;
use parking_lot::RwLock;

use crate::{
    client::{Cursor, FailPoint, FailPoints, Snapshot, Transaction, TxnKvClient},
    util::{CallContext, Result, Status, keys::key_successor},
};

/// Versioned key: user key ascending, then commit timestamp descending, so the
/// newest version of a key is met first.
type VersionKey = (Vec<u8>, Reverse<u64>);

struct TxnInner {
    /// `None` values are tombstones.
    versions: SkipMap<VersionKey, Option<Vec<u8>>>,
    /// Timestamp of the last commit.
    oracle: AtomicU64,
    /// Readers take it shared to pick a start timestamp; commits take it
    /// exclusive so a snapshot never sees half of a commit.
    commit_lock: RwLock<()>,
    failpoints: FailPoints,
    closed: AtomicBool,
    commits: AtomicU64,
    open_cursors: AtomicU64,
}

impl TxnInner {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Status::shutdown_in_progress("txn client is closed"));
        }
        Ok(())
    }

    fn begin_call(&self, ctx: &CallContext, point: FailPoint) -> Result<()> {
        self.ensure_open()?;
        ctx.check()?;
        self.failpoints.check(point)
    }

    /// Newest version of `key` committed at or before `read_ts`.
    /// `None` when the key is missing or deleted at that timestamp.
    fn read(&self, key: &[u8], read_ts: u64) -> Option<Vec<u8>> {
        let from = (key.to_vec(), Reverse(read_ts));
        let to = (key.to_vec(), Reverse(0));
        self.versions
            .range(from..=to)
            .next()
            .and_then(|entry| entry.value().clone())
    }

    /// Like [`TxnInner::read`] without copying the value.
    fn exists(&self, key: &[u8], read_ts: u64) -> bool {
        let from = (key.to_vec(), Reverse(read_ts));
        let to = (key.to_vec(), Reverse(0));
        self.versions
            .range(from..=to)
            .next()
            .is_some_and(|entry| entry.value().is_some())
    }

    fn latest_version(&self, key: &[u8]) -> Option<u64> {
        let from = (key.to_vec(), Reverse(u64::MAX));
        let to = (key.to_vec(), Reverse(0));
        self.versions
            .range(from..=to)
            .next()
            .map(|entry| entry.key().1.0)
    }
}

/// In-process transactional client with MVCC snapshot isolation.
///
/// Conflicts are detected first-committer-wins: a commit fails with `Busy`
/// if any key it writes has a version newer than the transaction's start
/// timestamp.
#[derive(Clone)]
pub struct MemoryTxnClient {
    inner: Arc<TxnInner>,
}

impl MemoryTxnClient {
    pub fn new() -> Self {
        MemoryTxnClient {
            inner: Arc::new(TxnInner {
                versions: SkipMap::new(),
                oracle: AtomicU64::new(0),
                commit_lock: RwLock::new(()),
                failpoints: FailPoints::new(),
                closed: AtomicBool::new(false),
                commits: AtomicU64::new(0),
                open_cursors: AtomicU64::new(0),
            }),
        }
    }

    pub fn failpoints(&self) -> &FailPoints {
        &self.inner.failpoints
    }

    /// Number of successful commits.
    pub fn commits(&self) -> u64 {
        self.inner.commits.load(Ordering::Relaxed)
    }

    /// Cursors opened and not yet closed.
    pub fn open_cursors(&self) -> u64 {
        self.inner.open_cursors.load(Ordering::Relaxed)
    }

    /// Latest committed value of `key`, bypassing transactions.
    pub fn peek(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner
            .read(key, self.inner.oracle.load(Ordering::Acquire))
    }
}

impl Default for MemoryTxnClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TxnKvClient for MemoryTxnClient {
    #[tracing::instrument(level = "trace", skip_all)]
    fn begin(&self, ctx: &CallContext) -> Result<Box<dyn Transaction>> {
        self.inner.begin_call(ctx, FailPoint::Begin)?;
        let start_ts = {
            let _guard = self.inner.commit_lock.read();
            self.inner.oracle.load(Ordering::Acquire)
        };
        Ok(Box::new(MemoryTransaction {
            inner: self.inner.clone(),
            start_ts,
            writes: BTreeMap::new(),
        }))
    }

    fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }
}

struct MemoryTransaction {
    inner: Arc<TxnInner>,
    start_ts: u64,
    /// `None` marks a buffered delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Transaction for MemoryTransaction {
    fn start_ts(&self) -> u64 {
        self.start_ts
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn get(&self, ctx: &CallContext, key: &[u8]) -> Result<Vec<u8>> {
        self.inner.begin_call(ctx, FailPoint::Get)?;
        let value = match self.writes.get(key) {
            Some(buffered) => buffered.clone(),
            None => self.inner.read(key, self.start_ts),
        };
        value.ok_or_else(|| Status::not_found("key not found"))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.ensure_open()?;
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.inner.ensure_open()?;
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn iter(
        &self,
        ctx: &CallContext,
        lower: &[u8],
        upper: Option<&[u8]>,
    ) -> Result<Box<dyn Cursor>> {
        self.inner.begin_call(ctx, FailPoint::OpenCursor)?;
        Ok(Box::new(MemoryCursor::open(
            self.inner.clone(),
            self.start_ts,
            lower,
            upper,
        )))
    }

    fn snapshot(&self) -> Box<dyn Snapshot> {
        Box::new(MemorySnapshot {
            inner: self.inner.clone(),
            read_ts: self.start_ts,
        })
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn commit(self: Box<Self>, ctx: &CallContext) -> Result<()> {
        self.inner.begin_call(ctx, FailPoint::Commit)?;
        let MemoryTransaction {
            inner,
            start_ts,
            writes,
        } = *self;

        if writes.is_empty() {
            return Ok(());
        }

        let _guard = inner.commit_lock.write();
        for key in writes.keys() {
            if let Some(version) = inner.latest_version(key)
                && version > start_ts
            {
                return Err(Status::busy(format!(
                    "write conflict on key {:?} (version {version} > start {start_ts})",
                    String::from_utf8_lossy(key)
                )));
            }
        }

        let commit_ts = inner.oracle.load(Ordering::Acquire) + 1;
        for (key, value) in writes {
            inner.versions.insert((key, Reverse(commit_ts)), value);
        }
        inner.oracle.store(commit_ts, Ordering::Release);
        inner.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn rollback(self: Box<Self>) {}
}

struct MemorySnapshot {
    inner: Arc<TxnInner>,
    read_ts: u64,
}

impl Snapshot for MemorySnapshot {
    #[tracing::instrument(level = "trace", skip_all)]
    fn get(&self, ctx: &CallContext, key: &[u8]) -> Result<Vec<u8>> {
        self.inner.begin_call(ctx, FailPoint::Get)?;
        self.inner
            .read(key, self.read_ts)
            .ok_or_else(|| Status::not_found("key not found"))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn exists(&self, ctx: &CallContext, key: &[u8]) -> Result<bool> {
        self.inner.begin_call(ctx, FailPoint::Get)?;
        Ok(self.inner.exists(key, self.read_ts))
    }
}

/// Forward cursor over the versions visible at `read_ts`.
///
/// Holds the current entry by value and re-seeks from its successor on each
/// `next`, so concurrent commits never move it.
struct MemoryCursor {
    inner: Arc<TxnInner>,
    read_ts: u64,
    upper: Option<Vec<u8>>,
    current: Option<(Vec<u8>, Vec<u8>)>,
    closed: bool,
}

impl MemoryCursor {
    fn open(inner: Arc<TxnInner>, read_ts: u64, lower: &[u8], upper: Option<&[u8]>) -> Self {
        inner.open_cursors.fetch_add(1, Ordering::Relaxed);
        let mut cursor = MemoryCursor {
            inner,
            read_ts,
            upper: upper.map(<[u8]>::to_vec),
            current: None,
            closed: false,
        };
        cursor.seek(lower);
        cursor
    }

    /// Positions at the first live key `>= from` visible at `read_ts`.
    fn seek(&mut self, from: &[u8]) {
        self.current = None;
        let start = (from.to_vec(), Reverse(u64::MAX));
        // Key whose newest visible version has been looked at already.
        let mut resolved: Option<Vec<u8>> = None;

        for entry in self.inner.versions.range(start..) {
            let (key, Reverse(version)) = entry.key();
            if let Some(upper) = &self.upper
                && key >= upper
            {
                return;
            }
            if *version > self.read_ts || resolved.as_ref() == Some(key) {
                continue;
            }
            match entry.value() {
                Some(value) => {
                    self.current = Some((key.clone(), value.clone()));
                    return;
                },
                None => resolved = Some(key.clone()),
            }
        }
    }
}

impl Cursor for MemoryCursor {
    fn valid(&self) -> bool {
        !self.closed && self.current.is_some()
    }

    fn key(&self) -> &[u8] {
        match &self.current {
            Some((key, _)) if !self.closed => key,
            _ => &[],
        }
    }

    fn value(&self) -> &[u8] {
        match &self.current {
            Some((_, value)) if !self.closed => value,
            _ => &[],
        }
    }

    fn next(&mut self) -> Result<()> {
        if self.closed {
            return Err(Status::invalid_argument("cursor is closed"));
        }
        self.inner.ensure_open()?;
        self.inner.failpoints.check(FailPoint::CursorNext)?;
        if let Some((key, _)) = self.current.take() {
            self.seek(&key_successor(&key));
        }
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.inner.open_cursors.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.close();
    }
}
