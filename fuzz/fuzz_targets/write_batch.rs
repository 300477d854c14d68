#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;
use remotekv::{Database, KeyValueReader, KeyValueStore, KeyValueWriter, StoreOptions};

// Fuzz target for batch resolution.
// Applies an arbitrary put/delete sequence through one batch and checks the
// store against a last-write-wins model.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let options = if data[0] % 2 == 0 {
        StoreOptions::raw()
    } else {
        StoreOptions::txn()
    };
    let db = match Database::open_in_memory(options) {
        Ok(db) => db,
        Err(_) => return,
    };

    let batch = db.new_batch();
    let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
    let mut expected_size = 0usize;

    let mut i = 1;
    while i + 2 < data.len() {
        let op_type = data[i] % 3;
        i += 1;

        let key_len = (data[i] as usize % 8).min(data.len() - i - 1);
        i += 1;
        let key = &data[i..i + key_len];
        i += key_len;

        match op_type {
            0 => {
                if i >= data.len() {
                    break;
                }
                let value_len = (data[i] as usize % 16).min(data.len() - i - 1);
                i += 1;
                let value = &data[i..i + value_len];
                i += value_len;

                batch.put(key, Some(value)).unwrap();
                model.insert(key.to_vec(), value.to_vec());
                expected_size += value.len();
            },
            1 => {
                batch.put(key, None).unwrap();
                model.insert(key.to_vec(), vec![0x00]);
            },
            _ => {
                batch.delete(key).unwrap();
                model.remove(key);
                expected_size += key.len();
            },
        }
    }

    assert_eq!(batch.value_size(), expected_size);
    batch.write().unwrap();

    for (key, value) in &model {
        assert_eq!(db.get(key).unwrap().as_ref(), Some(value));
    }

    let mut iter = db.new_iterator(b"", b"").unwrap();
    let mut seen = Vec::new();
    while iter.next() {
        seen.push((iter.key().to_vec(), iter.value().to_vec()));
    }
    iter.release();
    assert_eq!(seen, model.into_iter().collect::<Vec<_>>());
});
