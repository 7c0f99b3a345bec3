use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use probe_hash::HashTable;
use probe_hash::hash_fns::direct_equal;
use probe_hash::hash_fns::direct_hash;
use probe_hash::hash_fns::hashed;
use probe_hash::hash_fns::int64_hash;
use probe_hash::hash_fns::str_equal;
use probe_hash::hash_fns::str_hash;

#[derive(Debug)]
struct Zone {
    name: &'static str,
}

#[test_log::test]
fn identity_keys_ignore_content() {
    let mut table = HashTable::builder_with_equal(direct_hash::<Zone>, direct_equal::<Zone>).build();

    let a = Arc::new(Zone { name: "UTC" });
    let b = Arc::new(Zone { name: "UTC" });
    table.insert(Arc::clone(&a), 1);
    table.insert(Arc::clone(&b), 2);

    assert_eq!(table.len(), 2);
    assert_eq!(table.lookup(&a), Some(&1));
    assert_eq!(table.lookup(&b), Some(&2));
    assert_eq!(table.lookup(&Arc::new(Zone { name: "UTC" })), None);
    assert!(table.keys().all(|zone| zone.name == "UTC"));
}

#[test_log::test]
fn string_interning_set() {
    let released = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&released);
    let mut interned = HashTable::builder_with_equal(str_hash::<String>, str_equal::<String>)
        .key_destroy(move |key: String| sink.lock().unwrap().push(key))
        .build_set();

    for word in "the quick brown fox jumps over the lazy dog".split(' ') {
        interned.add(word.to_string());
    }
    assert_eq!(interned.len(), 8);

    let the = "the".to_string();
    assert_eq!(interned.lookup(&the), Some(&the));

    assert_eq!(interned.foreach_remove(|word, _| word.len() == 3), 3);
    let mut released = released.lock().unwrap().clone();
    released.sort();
    // "the" was added twice; the second add discarded the first copy.
    assert_eq!(released, ["dog", "fox", "the", "the"].map(String::from));
}

#[test_log::test]
fn wide_integer_keys() {
    let mut table = HashTable::new(int64_hash);
    for i in 0..2000i64 {
        table.insert(i << 32 | (i & 0xFF), i);
    }
    for i in 0..2000i64 {
        assert_eq!(table.lookup(&(i << 32 | (i & 0xFF))), Some(&i));
    }
}

#[test_log::test]
fn shared_table_across_threads() {
    let mut table = HashTable::new(hashed::<String>());
    for i in 0..100 {
        table.insert(format!("key-{i}"), i);
    }
    let shared = table.into_shared();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let handle = shared.acquire();
            thread::spawn(move || handle.values().sum::<i32>())
        })
        .collect();
    let sums: Vec<i32> = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .collect();

    assert_eq!(sums, vec![4950; 4]);
    assert_eq!(shared.ref_count(), 1);
    assert!(shared.release());
}
