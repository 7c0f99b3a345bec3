//! Hash and equality functions accepted by [`HashTable`](crate::HashTable),
//! plus the stock implementations most tables are created with.

use alloc::sync::Arc;
use core::hash::BuildHasher;
use core::hash::Hash;

/// Computes the digest of a key.
pub type HashFn<K> = Arc<dyn Fn(&K) -> u64 + Send + Sync>;

/// Decides whether two keys are the same key.
pub type EqualFn<K> = Arc<dyn Fn(&K, &K) -> bool + Send + Sync>;

/// Receives ownership of a key or value evicted from a table.
pub type DestroyFn<T> = Arc<dyn Fn(T) + Send + Sync>;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The default [`BuildHasher`] used by [`hashed`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The default [`BuildHasher`] used by [`hashed`].
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    }
}

/// Adapts a [`BuildHasher`] into a hash function for any [`Hash`] key.
///
/// # Examples
///
/// ```rust
/// use std::collections::hash_map::RandomState;
///
/// use probe_hash::HashTable;
/// use probe_hash::hash_fns::hash_with;
///
/// let mut table = HashTable::new(hash_with(RandomState::new()));
/// table.insert("key".to_string(), 1);
/// assert_eq!(table.lookup(&"key".to_string()), Some(&1));
/// ```
pub fn hash_with<K, S>(state: S) -> impl Fn(&K) -> u64 + Send + Sync + 'static
where
    K: Hash,
    S: BuildHasher + Send + Sync + 'static,
{
    move |key: &K| state.hash_one(key)
}

/// A hash function backed by a freshly seeded [`DefaultHashBuilder`].
#[cfg(any(feature = "foldhash", feature = "std"))]
pub fn hashed<K: Hash>() -> impl Fn(&K) -> u64 + Send + Sync + 'static {
    hash_with(DefaultHashBuilder::default())
}

/// Hashes a shared pointer by address.
///
/// Pair with [`direct_equal`] to key a table on object identity.
pub fn direct_hash<T: ?Sized>(key: &Arc<T>) -> u64 {
    Arc::as_ptr(key) as *const () as usize as u64
}

/// Compares two shared pointers by address.
pub fn direct_equal<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::ptr_eq(a, b)
}

/// The `h * 33 + c` string digest, seeded with 5381.
///
/// Stable across runs and platforms, which makes it suitable for interning
/// tables whose layout is inspected in tests.
pub fn str_hash<S: AsRef<str> + ?Sized>(key: &S) -> u64 {
    let mut hash: u32 = 5381;
    for &byte in key.as_ref().as_bytes() {
        hash = (hash << 5).wrapping_add(hash).wrapping_add(byte as i8 as u32);
    }
    hash as u64
}

/// Compares two strings by content.
pub fn str_equal<S: AsRef<str> + ?Sized>(a: &S, b: &S) -> bool {
    a.as_ref() == b.as_ref()
}

/// Hashes a 32-bit integer to itself.
pub fn int_hash(key: &i32) -> u64 {
    *key as u32 as u64
}

/// Folds the high half of a 64-bit integer into the low half.
pub fn int64_hash(key: &i64) -> u64 {
    let v = *key as u64;
    (v ^ (v >> 32)) & 0xFFFF_FFFF
}

/// Hashes a machine word to itself.
pub fn uint_hash(key: &usize) -> u64 {
    *key as u64
}

/// Compares two integers.
pub fn int_equal<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}
