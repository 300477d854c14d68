use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::{
    batch::{Batch, BatchBuffer},
    client::TxnKvClient,
    db::KeyValueWriter,
    statistics::Statistics,
    util::{CallContext, Result},
};

/// Batch for the transactional backend.
///
/// Flushes every resolved operation inside one transaction that commits
/// once, so a failed `write` leaves the store untouched.
pub struct TxnBatch {
    client: Arc<dyn TxnKvClient>,
    buffer: BatchBuffer,
    call_timeout: Option<Duration>,
    statistics: Arc<Statistics>,
}

impl TxnBatch {
    pub fn new(
        client: Arc<dyn TxnKvClient>,
        call_timeout: Option<Duration>,
        statistics: Arc<Statistics>,
    ) -> Self {
        TxnBatch {
            client,
            buffer: BatchBuffer::new(),
            call_timeout,
            statistics,
        }
    }
}

impl KeyValueWriter for TxnBatch {
    fn put(&self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.buffer.put(key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.buffer.delete(key);
        Ok(())
    }
}

impl Batch for TxnBatch {
    fn value_size(&self) -> usize {
        self.buffer.value_size()
    }

    fn write(&self) -> Result<()> {
        self.write_with(&CallContext::from_timeout(self.call_timeout))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn write_with(&self, ctx: &CallContext) -> Result<()> {
        self.buffer.flush(|resolved, size| {
            debug!(
                deletes = resolved.delete_keys.len(),
                puts = resolved.put_keys.len(),
                size,
                "committing txn batch"
            );

            let result = (|| {
                let mut txn = self.client.begin(ctx)?;
                for key in &resolved.delete_keys {
                    if let Err(e) = txn.delete(key) {
                        txn.rollback();
                        return Err(e);
                    }
                }
                for (key, value) in resolved.put_keys.iter().zip(&resolved.put_values) {
                    if let Err(e) = txn.set(key, value) {
                        txn.rollback();
                        return Err(e);
                    }
                }
                txn.commit(ctx)
            })();

            match result {
                Ok(()) => {
                    self.statistics.record_batch_write(
                        resolved.put_keys.len() as u64,
                        resolved.delete_keys.len() as u64,
                        size as u64,
                    );
                    Ok(())
                },
                Err(e) => {
                    self.statistics.record_error();
                    Err(e)
                },
            }
        })
    }

    fn reset(&self) {
        self.buffer.reset();
    }

    fn replay(&self, sink: &dyn KeyValueWriter) -> Result<()> {
        self.buffer.replay(sink)
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }
}
