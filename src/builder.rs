//! Configuration of a [`HashTable`] before it is created.

use alloc::sync::Arc;

use crate::error::Result;
use crate::error::infallible;
use crate::hash_fns::DestroyFn;
use crate::hash_fns::EqualFn;
use crate::hash_fns::HashFn;
use crate::hash_table::HashTable;
use crate::storage::SetOps;

/// Collects the hash, equality and destroy functions of a new table.
///
/// Created by [`HashTable::builder`] or [`HashTable::builder_with_equal`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicUsize;
/// use std::sync::atomic::Ordering;
///
/// use probe_hash::HashTable;
/// use probe_hash::hash_fns::str_hash;
///
/// let evicted = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&evicted);
///
/// let mut zones: HashTable<String, i32> = HashTable::builder(str_hash::<String>)
///     .value_destroy(move |_offset| {
///         counter.fetch_add(1, Ordering::Relaxed);
///     })
///     .build();
///
/// zones.insert("CET".to_string(), 3600);
/// zones.insert("CET".to_string(), 7200);
/// assert_eq!(evicted.load(Ordering::Relaxed), 1);
/// ```
pub struct Builder<K, V> {
    hash_fn: HashFn<K>,
    equal_fn: EqualFn<K>,
    key_destroy: Option<DestroyFn<K>>,
    value_destroy: Option<DestroyFn<V>>,
}

fn identity<K>(key: &K) -> &K {
    key
}

impl<K: Eq, V> HashTable<K, V> {
    /// Starts configuring a table whose keys compare with `==`.
    pub fn builder(hash_fn: impl Fn(&K) -> u64 + Send + Sync + 'static) -> Builder<K, V> {
        Self::builder_with_equal(hash_fn, |a: &K, b: &K| a == b)
    }
}

impl<K, V> HashTable<K, V> {
    /// Starts configuring a table whose keys compare with `equal_fn`.
    ///
    /// Keys that hash alike must also compare equal under `equal_fn`
    /// whenever they are meant to be the same key.
    pub fn builder_with_equal(
        hash_fn: impl Fn(&K) -> u64 + Send + Sync + 'static,
        equal_fn: impl Fn(&K, &K) -> bool + Send + Sync + 'static,
    ) -> Builder<K, V> {
        Builder {
            hash_fn: Arc::new(hash_fn),
            equal_fn: Arc::new(equal_fn),
            key_destroy: None,
            value_destroy: None,
        }
    }
}

impl<K, V> Builder<K, V> {
    /// Replaces the equality function.
    pub fn equal_fn(mut self, equal_fn: impl Fn(&K, &K) -> bool + Send + Sync + 'static) -> Self {
        self.equal_fn = Arc::new(equal_fn);
        self
    }

    /// Receives every key the table discards, except stolen ones.
    pub fn key_destroy(mut self, destroy: impl Fn(K) + Send + Sync + 'static) -> Self {
        self.key_destroy = Some(Arc::new(destroy));
        self
    }

    /// Receives every value the table discards, except stolen ones.
    pub fn value_destroy(mut self, destroy: impl Fn(V) + Send + Sync + 'static) -> Self {
        self.value_destroy = Some(Arc::new(destroy));
        self
    }

    /// Creates the table.
    pub fn build(self) -> HashTable<K, V> {
        infallible(self.try_build())
    }

    /// Creates the table, reporting allocation failure.
    pub fn try_build(self) -> Result<HashTable<K, V>> {
        HashTable::try_from_parts(
            self.hash_fn,
            self.equal_fn,
            self.key_destroy,
            self.value_destroy,
            None,
        )
    }
}

impl<K: Clone> Builder<K, K> {
    /// Creates a set-mode table.
    ///
    /// Entries added with [`HashTable::add`] share a single array for keys and
    /// values. Destroy callbacks see such an entry once, as a key.
    pub fn build_set(self) -> HashTable<K, K> {
        infallible(self.try_build_set())
    }

    /// Creates a set-mode table, reporting allocation failure.
    pub fn try_build_set(self) -> Result<HashTable<K, K>> {
        HashTable::try_from_parts(
            self.hash_fn,
            self.equal_fn,
            self.key_destroy,
            self.value_destroy,
            Some(SetOps {
                as_value: identity,
                to_value: K::clone,
                into_value: core::convert::identity,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;

    use super::*;
    use crate::hash_fns::str_hash;

    #[test]
    fn custom_equality_folds_case() {
        let mut table: HashTable<String, u32> = HashTable::builder(str_hash::<String>)
            .equal_fn(|a: &String, b: &String| a.eq_ignore_ascii_case(b))
            .build();
        // Same digest is required for keys meant to be equal.
        let mut folded = HashTable::builder_with_equal(
            |key: &String| str_hash(&key.to_ascii_lowercase()),
            |a: &String, b: &String| a.eq_ignore_ascii_case(b),
        )
        .build();

        table.insert("utc".to_string(), 0);
        folded.insert("utc".to_string(), 0);
        folded.insert("UTC".to_string(), 1);

        assert_eq!(folded.len(), 1);
        assert_eq!(folded.lookup(&"Utc".to_string()), Some(&1));
        assert_eq!(table.lookup(&"utc".to_string()), Some(&0));
    }

    #[test]
    fn build_set_starts_aliased() {
        let set: HashTable<String, String> = HashTable::builder(str_hash::<String>).build_set();
        assert!(set.storage.is_aliased());
        assert!(set.set_ops.is_some());

        let map: HashTable<String, String> = HashTable::builder(str_hash::<String>).build();
        assert!(!map.storage.is_aliased());
    }

    #[test]
    fn try_build_reports_success() {
        let table = HashTable::<u8, u8>::builder(|key: &u8| *key as u64)
            .try_build()
            .unwrap();
        assert_eq!(table.capacity(), 8);
    }
}
