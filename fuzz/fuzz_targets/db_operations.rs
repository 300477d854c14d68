#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;
use remotekv::{Database, KeyValueReader, KeyValueStore, KeyValueWriter, StoreOptions};

// Fuzz target for point operations and prefix iteration.
// Small scan limits force the paginated iterator across page boundaries.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let options = StoreOptions {
        scan_limit: 1 + data[0] as usize % 4,
        ..if data[1] % 2 == 0 {
            StoreOptions::raw()
        } else {
            StoreOptions::txn()
        }
    };
    let db = match Database::open_in_memory(options) {
        Ok(db) => db,
        Err(_) => return,
    };
    let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

    for chunk in data[2..].chunks(4) {
        let op = chunk[0] % 4;
        let key: Vec<u8> = chunk.iter().skip(1).take(2).map(|b| b % 4).collect();

        match op {
            0 => {
                let value = chunk.to_vec();
                db.put(&key, Some(&value[..])).unwrap();
                model.insert(key, value);
            },
            1 => {
                db.delete(&key).unwrap();
                model.remove(&key);
            },
            2 => {
                assert_eq!(db.get(&key).unwrap(), model.get(&key).cloned());
            },
            _ => {
                let (prefix, start) = key.split_at(key.len().min(1));
                let mut lower = prefix.to_vec();
                lower.extend_from_slice(start);
                let expected: Vec<Vec<u8>> = model
                    .range(lower..)
                    .map(|(k, _)| k.clone())
                    .filter(|k| k.starts_with(prefix))
                    .collect();

                let mut iter = db.new_iterator(prefix, start).unwrap();
                let mut seen = Vec::new();
                while iter.next() {
                    seen.push(iter.key().to_vec());
                }
                assert!(iter.error().is_none());
                iter.release();
                assert_eq!(seen, expected);
            },
        }
    }
});
