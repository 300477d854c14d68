use std::sync::Arc;

use remotekv::{
    Database, KeyValueReader, KeyValueStore, KeyValueWriter, MemoryRawClient, Statistics,
    StoreOptions,
};

#[test]
fn test_statistics_basic_tracking() {
    for options in [StoreOptions::raw(), StoreOptions::txn()] {
        let db = Database::open_in_memory(options).unwrap();
        let stats = db.statistics().clone();

        assert_eq!(stats.num_keys_written(), 0);
        assert_eq!(stats.num_keys_read(), 0);

        db.put(b"key1", Some(b"value1".as_slice())).unwrap();
        db.put(b"key2", Some(b"value2".as_slice())).unwrap();
        db.get(b"key1").unwrap();
        db.get(b"missing").unwrap();
        db.delete(b"key2").unwrap();

        assert_eq!(stats.num_keys_written(), 2);
        assert_eq!(stats.bytes_written(), 12);
        assert_eq!(stats.num_keys_read(), 2);
        assert_eq!(stats.bytes_read(), 6);
        assert_eq!(stats.num_keys_deleted(), 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);

        let report = db.stat("stats").unwrap();
        assert!(report.contains("Store Statistics"));
        assert!(report.contains("Operations:"));
        assert!(report.contains("Batches:"));
        assert!(report.contains("Iteration:"));
    }
}

#[test]
fn test_batch_and_iterator_tracking() {
    let options = StoreOptions {
        scan_limit: 2,
        ..StoreOptions::raw()
    };
    let client = MemoryRawClient::new();
    let db = Database::with_raw_client(Arc::new(client.clone()), options).unwrap();

    let batch = db.new_batch();
    for key in ["a1", "a2", "a3", "b1"] {
        batch.put(key.as_bytes(), Some(b"v".as_slice())).unwrap();
    }
    batch.put(b"a1", Some(b"vv".as_slice())).unwrap();
    batch.write().unwrap();

    let stats = db.statistics();
    assert_eq!(stats.num_batch_writes(), 1);
    assert!(stats.report().contains("Puts:          4"));
    assert!(stats.report().contains("Bytes:         6"));

    let mut iter = db.new_iterator(b"a", b"").unwrap();
    while iter.next() {}
    iter.release();

    // Pages of two: [a1, a2], [a3], then an empty page.
    assert_eq!(stats.num_pages_fetched(), 3);
    assert_eq!(client.scan_calls(), 3);
    assert!(stats.report().contains("Iterators:     1"));
    assert!(stats.report().contains("Scanned:       3"));
}

#[test]
fn test_txn_iterator_tracking() {
    let db = Database::open_in_memory(StoreOptions::txn()).unwrap();
    db.put(b"a1", None).unwrap();

    let mut iter = db.new_iterator(b"a", b"").unwrap();
    assert!(iter.next());
    iter.release();

    assert_eq!(db.statistics().num_cursors_opened(), 1);
    assert_eq!(db.statistics().num_pages_fetched(), 0);
}

#[test]
fn test_statistics_report_format() {
    let stats = Statistics::new();

    stats.record_write(1024);
    stats.record_write(2048);
    stats.record_read(512);
    stats.record_read(512);
    stats.record_not_found();
    stats.record_delete();

    let report = stats.report();
    assert!(report.contains("Keys written:  2"));
    assert!(report.contains("Keys read:     3"));
    assert!(report.contains("Keys deleted:  1"));
    assert!(report.contains("Bytes written: 3072"));
    assert!(report.contains("Bytes read:    1024"));
    assert!(report.contains("Hit rate:      66.67%"));
}

#[test]
fn test_statistics_reset() {
    let stats = Statistics::new();

    stats.record_write(100);
    stats.record_read(50);
    stats.record_error();

    stats.reset();

    assert_eq!(stats.num_keys_written(), 0);
    assert_eq!(stats.num_keys_read(), 0);
    assert_eq!(stats.bytes_written(), 0);
    assert_eq!(stats.bytes_read(), 0);
    assert_eq!(stats.num_errors(), 0);
}

#[test]
fn test_statistics_concurrent_updates() {
    use std::thread;

    let stats = Arc::new(Statistics::new());
    let mut handles = vec![];

    for _ in 0..4 {
        let stats_clone = Arc::clone(&stats);
        let handle = thread::spawn(move || {
            for _ in 0..1000 {
                stats_clone.record_write(100);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stats.num_keys_written(), 4000);
    assert_eq!(stats.bytes_written(), 400000);
}
