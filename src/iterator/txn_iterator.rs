use std::sync::Arc;

use tracing::warn;

use crate::{
    client::{Cursor, Transaction, TxnKvClient},
    iterator::KvIterator,
    statistics::Statistics,
    util::{
        CallContext, Result, Status,
        keys::{is_past_prefix, join_key, prefix_upper_bound},
    },
};

/// Prefix iterator over a transactional backend.
///
/// Opens a read-only transaction and a server-side cursor on its snapshot,
/// so the whole iteration sees the store as of construction. `release`
/// closes the cursor and rolls the transaction back.
pub struct TxnIterator {
    txn: Option<Box<dyn Transaction>>,
    cursor: Option<Box<dyn Cursor>>,
    prefix: Vec<u8>,
    lower_bound: Vec<u8>,
    statistics: Arc<Statistics>,

    /// The cursor already sits on its first entry; the first `next` must
    /// not advance it.
    first_call: bool,
    positioned: bool,
    exhausted: bool,
    err: Option<Status>,
}

impl TxnIterator {
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn new(
        client: &dyn TxnKvClient,
        ctx: &CallContext,
        prefix: &[u8],
        start: &[u8],
        statistics: Arc<Statistics>,
    ) -> Result<Self> {
        let lower_bound = join_key(prefix, start);
        let upper_bound = prefix_upper_bound(prefix);

        let txn = client.begin(ctx)?;
        let cursor = match txn.iter(ctx, &lower_bound, upper_bound.as_deref()) {
            Ok(cursor) => cursor,
            Err(e) => {
                txn.rollback();
                return Err(e);
            },
        };
        statistics.record_iterator();
        statistics.record_cursor_open();

        Ok(TxnIterator {
            txn: Some(txn),
            cursor: Some(cursor),
            prefix: prefix.to_vec(),
            lower_bound,
            statistics,
            first_call: true,
            positioned: false,
            exhausted: false,
            err: None,
        })
    }

    fn fail(&mut self, err: Status) -> bool {
        warn!(error = %err, "snapshot cursor failed");
        self.statistics.record_error();
        self.err = Some(err);
        self.positioned = false;
        false
    }
}

impl KvIterator for TxnIterator {
    fn next(&mut self) -> bool {
        self.positioned = false;
        if self.exhausted || self.err.is_some() {
            return false;
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return false;
        };

        if !self.first_call
            && let Err(e) = cursor.next()
        {
            return self.fail(e);
        }
        self.first_call = false;

        loop {
            if !cursor.valid() {
                self.exhausted = true;
                return false;
            }
            let key = cursor.key();
            if key.starts_with(&self.prefix) && key >= self.lower_bound.as_slice() {
                self.positioned = true;
                return true;
            }
            if is_past_prefix(key, &self.prefix) {
                self.exhausted = true;
                return false;
            }
            if let Err(e) = cursor.next() {
                return self.fail(e);
            }
        }
    }

    fn error(&self) -> Option<&Status> {
        self.err.as_ref()
    }

    fn key(&self) -> &[u8] {
        match &self.cursor {
            Some(cursor) if self.positioned => cursor.key(),
            _ => &[],
        }
    }

    fn value(&self) -> &[u8] {
        match &self.cursor {
            Some(cursor) if self.positioned => cursor.value(),
            _ => &[],
        }
    }

    fn release(&mut self) {
        self.positioned = false;
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
        if let Some(txn) = self.txn.take() {
            txn.rollback();
        }
    }
}

impl Drop for TxnIterator {
    fn drop(&mut self) {
        self.release();
    }
}
