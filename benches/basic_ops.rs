use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use remotekv::{
    BackendMode, Database, KeyValueReader, KeyValueStore, KeyValueWriter, StoreOptions,
};

const MODES: [BackendMode; 2] = [BackendMode::Raw, BackendMode::Txn];

fn setup_db(mode: BackendMode, scan_limit: usize) -> Database {
    let options = StoreOptions {
        mode,
        scan_limit,
        ..Default::default()
    };
    Database::open_in_memory(options).unwrap()
}

fn populate(db: &Database, n: usize, value: &[u8]) {
    let batch = db.new_batch();
    for i in 0..n {
        batch
            .put(format!("key{i:010}").as_bytes(), Some(value))
            .unwrap();
    }
    batch.write().unwrap();
}

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");
    group.throughput(Throughput::Elements(1));

    for mode in MODES {
        group.bench_function(BenchmarkId::new("put_100b", format!("{mode:?}")), |b| {
            let db = setup_db(mode, 128);
            let value = vec![b'x'; 100];
            let mut i = 0u64;
            b.iter(|| {
                let key = format!("key{i:010}");
                db.put(key.as_bytes(), Some(value.as_slice())).unwrap();
                i += 1;
            });
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    for mode in MODES {
        group.bench_function(BenchmarkId::new("get_hit", format!("{mode:?}")), |b| {
            let db = setup_db(mode, 128);
            populate(&db, 10_000, &[b'x'; 100]);
            let mut i = 0u64;
            b.iter(|| {
                let key = format!("key{:010}", i % 10_000);
                black_box(db.get(key.as_bytes()).unwrap());
                i += 1;
            });
        });

        group.bench_function(BenchmarkId::new("get_miss", format!("{mode:?}")), |b| {
            let db = setup_db(mode, 128);
            populate(&db, 1_000, &[b'x'; 100]);
            let mut i = 0u64;
            b.iter(|| {
                let key = format!("missing{i:010}");
                black_box(db.get(key.as_bytes()).unwrap());
                i += 1;
            });
        });
    }

    group.finish();
}

fn bench_batch_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_write");

    for mode in MODES {
        for size in [10usize, 100, 1000] {
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}"), size),
                &size,
                |b, &size| {
                    let db = setup_db(mode, 128);
                    let value = vec![b'x'; 100];
                    b.iter(|| {
                        let batch = db.new_batch();
                        for i in 0..size {
                            let key = format!("key{:010}", i % (size / 2 + 1));
                            if i % 5 == 4 {
                                batch.delete(key.as_bytes()).unwrap();
                            } else {
                                batch.put(key.as_bytes(), Some(value.as_slice())).unwrap();
                            }
                        }
                        batch.write().unwrap();
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");
    group.throughput(Throughput::Elements(1_000));

    for mode in MODES {
        for scan_limit in [16usize, 128, 1024] {
            if mode == BackendMode::Txn && scan_limit != 128 {
                // Snapshot iteration does not page.
                continue;
            }
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}"), scan_limit),
                &scan_limit,
                |b, &scan_limit| {
                    let db = setup_db(mode, scan_limit);
                    populate(&db, 1_000, &[b'x'; 100]);
                    db.put(b"other", Some(b"x".as_slice())).unwrap();
                    b.iter(|| {
                        let mut iter = db.new_iterator(b"key", b"").unwrap();
                        let mut n = 0;
                        while iter.next() {
                            black_box(iter.value());
                            n += 1;
                        }
                        iter.release();
                        assert_eq!(n, 1_000);
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_put,
    bench_get,
    bench_batch_write,
    bench_iterate
);
criterion_main!(benches);
