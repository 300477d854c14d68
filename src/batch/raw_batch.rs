use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::{
    batch::{Batch, BatchBuffer},
    client::RawKvClient,
    db::KeyValueWriter,
    statistics::Statistics,
    util::{CallContext, Result},
};

/// Batch for the raw-access backend.
///
/// Flushes with one `batch_delete` call followed by one `batch_put` call.
/// The two calls are independent: if the second fails the first stays
/// applied, and `write` reports only the error.
pub struct RawBatch {
    client: Arc<dyn RawKvClient>,
    buffer: BatchBuffer,
    call_timeout: Option<Duration>,
    statistics: Arc<Statistics>,
}

impl RawBatch {
    pub fn new(
        client: Arc<dyn RawKvClient>,
        call_timeout: Option<Duration>,
        statistics: Arc<Statistics>,
    ) -> Self {
        RawBatch {
            client,
            buffer: BatchBuffer::new(),
            call_timeout,
            statistics,
        }
    }
}

impl KeyValueWriter for RawBatch {
    fn put(&self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.buffer.put(key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.buffer.delete(key);
        Ok(())
    }
}

impl Batch for RawBatch {
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
                "flushing raw batch"
            );

            if let Err(e) = self.client.batch_delete(ctx, &resolved.delete_keys) {
                self.statistics.record_error();
                return Err(e);
            }

            if let Err(e) = self
                .client
                .batch_put(ctx, &resolved.put_keys, &resolved.put_values)
            {
                self.statistics.record_error();
                warn!(
                    applied_deletes = resolved.delete_keys.len(),
                    lost_puts = resolved.put_keys.len(),
                    error = %e,
                    "raw batch partially applied"
                );
                return Err(e);
            }

            self.statistics.record_batch_write(
                resolved.put_keys.len() as u64,
                resolved.delete_keys.len() as u64,
                size as u64,
            );
            Ok(())
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
