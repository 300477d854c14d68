use std::sync::atomic::{AtomicU64, Ordering};

/// Store-wide statistics
///
/// Thread-safe counters for the operations the adapter issues against the
/// remote service. Uses atomic counters for lock-free updates.
#[derive(Debug, Default)]
pub struct Statistics {
    // Point operations
    pub num_keys_written: AtomicU64,
    pub num_keys_read: AtomicU64,
    pub num_keys_deleted: AtomicU64,
    pub num_not_found: AtomicU64,

    // Bytes transferred
    pub bytes_written: AtomicU64,
    pub bytes_read: AtomicU64,

    // Batch commits
    pub num_batch_writes: AtomicU64,
    pub num_batch_puts: AtomicU64,
    pub num_batch_deletes: AtomicU64,
    pub batch_bytes: AtomicU64,

    // Iteration
    pub num_iterators: AtomicU64,
    pub num_pages_fetched: AtomicU64,
    pub num_entries_scanned: AtomicU64,
    pub num_cursors_opened: AtomicU64,

    // Error counts
    pub num_errors: AtomicU64,
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    #[inline]
    pub fn record_write(&self, bytes: u64) {
        self.num_keys_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_read(&self, bytes: u64) {
        self.num_keys_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_not_found(&self) {
        self.num_keys_read.fetch_add(1, Ordering::Relaxed);
        self.num_not_found.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_delete(&self) {
        self.num_keys_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// One resolved batch flush: `puts` and `deletes` after dedup,
    /// `bytes` as accounted by the buffer.
    #[inline]
    pub fn record_batch_write(&self, puts: u64, deletes: u64, bytes: u64) {
        self.num_batch_writes.fetch_add(1, Ordering::Relaxed);
        self.num_batch_puts.fetch_add(puts, Ordering::Relaxed);
        self.num_batch_deletes.fetch_add(deletes, Ordering::Relaxed);
        self.batch_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_iterator(&self) {
        self.num_iterators.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_page_fetch(&self, entries: u64) {
        self.num_pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.num_entries_scanned
            .fetch_add(entries, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cursor_open(&self) {
        self.num_cursors_opened.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.num_errors.fetch_add(1, Ordering::Relaxed);
    }

    // Getters (snapshot values)
    pub fn num_keys_written(&self) -> u64 {
        self.num_keys_written.load(Ordering::Relaxed)
    }

    pub fn num_keys_read(&self) -> u64 {
        self.num_keys_read.load(Ordering::Relaxed)
    }

    pub fn num_keys_deleted(&self) -> u64 {
        self.num_keys_deleted.load(Ordering::Relaxed)
    }

    pub fn num_batch_writes(&self) -> u64 {
        self.num_batch_writes.load(Ordering::Relaxed)
    }

    pub fn num_pages_fetched(&self) -> u64 {
        self.num_pages_fetched.load(Ordering::Relaxed)
    }

    pub fn num_cursors_opened(&self) -> u64 {
        self.num_cursors_opened.load(Ordering::Relaxed)
    }

    pub fn num_errors(&self) -> u64 {
        self.num_errors.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let reads = self.num_keys_read.load(Ordering::Relaxed) as f64;
        let misses = self.num_not_found.load(Ordering::Relaxed) as f64;
        if reads > 0.0 { (reads - misses) / reads } else { 0.0 }
    }

    /// Reset all statistics to zero
    pub fn reset(&self) {
        self.num_keys_written.store(0, Ordering::Relaxed);
        self.num_keys_read.store(0, Ordering::Relaxed);
        self.num_keys_deleted.store(0, Ordering::Relaxed);
        self.num_not_found.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.num_batch_writes.store(0, Ordering::Relaxed);
        self.num_batch_puts.store(0, Ordering::Relaxed);
        self.num_batch_deletes.store(0, Ordering::Relaxed);
        self.batch_bytes.store(0, Ordering::Relaxed);
        self.num_iterators.store(0, Ordering::Relaxed);
        self.num_pages_fetched.store(0, Ordering::Relaxed);
        self.num_entries_scanned.store(0, Ordering::Relaxed);
        self.num_cursors_opened.store(0, Ordering::Relaxed);
        self.num_errors.store(0, Ordering::Relaxed);
    }

    /// Get a formatted statistics report
    pub fn report(&self) -> String {
        format!(
            "Store Statistics:\n\
            \n\
            Operations:\n\
            - Keys written:  {}\n\
            - Keys read:     {}\n\
            - Keys deleted:  {}\n\
            - Not found:     {}\n\
            - Hit rate:      {:.2}%\n\
            - Bytes written: {} ({:.2} MB)\n\
            - Bytes read:    {} ({:.2} MB)\n\
            \n\
            Batches:\n\
            - Writes:        {}\n\
            - Puts:          {}\n\
            - Deletes:       {}\n\
            - Bytes:         {} ({:.2} MB)\n\
            \n\
            Iteration:\n\
            - Iterators:     {}\n\
            - Pages:         {}\n\
            - Scanned:       {}\n\
            - Cursors:       {}\n\
            \n\
            Errors:          {}",
            self.num_keys_written(),
            self.num_keys_read(),
            self.num_keys_deleted(),
            self.num_not_found.load(Ordering::Relaxed),
            self.hit_rate() * 100.0,
            self.bytes_written(),
            self.bytes_written() as f64 / 1024.0 / 1024.0,
            self.bytes_read(),
            self.bytes_read() as f64 / 1024.0 / 1024.0,
            self.num_batch_writes(),
            self.num_batch_puts.load(Ordering::Relaxed),
            self.num_batch_deletes.load(Ordering::Relaxed),
            self.batch_bytes.load(Ordering::Relaxed),
            self.batch_bytes.load(Ordering::Relaxed) as f64 / 1024.0 / 1024.0,
            self.num_iterators.load(Ordering::Relaxed),
            self.num_pages_fetched(),
            self.num_entries_scanned.load(Ordering::Relaxed),
            self.num_cursors_opened(),
            self.num_errors(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_basic() {
        let stats = Statistics::new();

        stats.record_write(100);
        stats.record_write(200);
        stats.record_read(50);

        assert_eq!(stats.num_keys_written(), 2);
        assert_eq!(stats.num_keys_read(), 1);
        assert_eq!(stats.bytes_written(), 300);
        assert_eq!(stats.bytes_read(), 50);
    }

    #[test]
    fn test_hit_rate() {
        let stats = Statistics::new();

        stats.record_read(1);
        stats.record_read(1);
        stats.record_read(1);
        stats.record_not_found();

        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_batch_stats() {
        let stats = Statistics::new();

        stats.record_batch_write(3, 1, 40);
        stats.record_batch_write(2, 0, 10);

        assert_eq!(stats.num_batch_writes(), 2);
        assert_eq!(stats.num_batch_puts.load(Ordering::Relaxed), 5);
        assert_eq!(stats.num_batch_deletes.load(Ordering::Relaxed), 1);
        assert_eq!(stats.batch_bytes.load(Ordering::Relaxed), 50);
    }

    #[test]
    fn test_statistics_reset() {
        let stats = Statistics::new();

        stats.record_write(100);
        stats.record_read(50);
        stats.record_delete();
        stats.record_page_fetch(2);

        stats.reset();

        assert_eq!(stats.num_keys_written(), 0);
        assert_eq!(stats.num_keys_read(), 0);
        assert_eq!(stats.num_keys_deleted(), 0);
        assert_eq!(stats.num_pages_fetched(), 0);
        assert_eq!(stats.num_entries_scanned.load(Ordering::Relaxed), 0);
        assert_eq!(stats.bytes_read(), 0);
    }

    #[test]
    fn test_statistics_report() {
        let stats = Statistics::new();

        stats.record_write(1024);
        stats.record_read(512);
        stats.record_not_found();

        let report = stats.report();
        assert!(report.contains("Keys written:  1"));
        assert!(report.contains("Keys read:     2"));
        assert!(report.contains("Hit rate:      50.00%"));
    }
}
