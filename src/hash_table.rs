use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::mem;
use core::sync::atomic::AtomicUsize;
use core::sync::atomic::Ordering;

use crate::error::Error;
use crate::error::Result;
use crate::error::infallible;
use crate::hash_fns::DestroyFn;
use crate::hash_fns::EqualFn;
use crate::hash_fns::HashFn;
use crate::probe::Capacity;
use crate::probe::Probe;
use crate::probe::coerce_hash;
use crate::storage::Bitmap;
use crate::storage::Carried;
use crate::storage::SetOps;
use crate::storage::Slot;
use crate::storage::Storage;
use crate::storage::try_reserve_to;

/// Where a probe walk ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lookup {
    /// The key lives in this slot.
    Found(usize),
    /// The key is absent; this is the slot a new entry would take (the first
    /// tombstone on the walk if there was one, otherwise the terminating
    /// empty slot).
    Vacant(usize),
}

/// Source of table identities. Cursors remember the identity of the table
/// that created them.
static NEXT_TABLE_ID: AtomicUsize = AtomicUsize::new(0);

fn next_table_id() -> usize {
    NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)
}

pub(crate) fn try_slots(len: usize) -> Result<Vec<Slot>> {
    let mut slots = Vec::new();
    try_reserve_to(&mut slots, len)?;
    slots.resize(len, Slot::Empty);
    Ok(slots)
}

/// An open-addressing hash table with triangular probing.
///
/// `HashTable<K, V>` stores owned keys and values in three parallel arrays
/// (slot status, keys, values) sized to a power of two. The start slot of a
/// key is its digest reduced modulo the largest prime below the table size,
/// and collisions walk the triangular sequence `start, start + 1, start + 3,
/// start + 6, ...`, which visits every slot once.
///
/// Removal leaves a tombstone behind so later probe walks still reach entries
/// placed past it. Tombstones are reclaimed by insertions and by resizes, which
/// rehash the table in place.
///
/// Keys are hashed and compared by caller-supplied functions, and optional
/// destroy callbacks receive every key and value the table discards.
///
/// ## Example
///
/// ```rust
/// use probe_hash::HashTable;
/// use probe_hash::hash_fns::int_hash;
///
/// let mut table = HashTable::new(int_hash);
/// table.insert(1, "a");
/// table.insert(2, "b");
/// table.insert(1, "c");
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.lookup(&1), Some(&"c"));
///
/// assert!(table.remove(&2));
/// assert!(!table.contains(&2));
/// ```
pub struct HashTable<K, V> {
    pub(crate) id: usize,
    pub(crate) capacity: Capacity,
    pub(crate) slots: Vec<Slot>,
    pub(crate) storage: Storage<K, V>,
    pub(crate) set_ops: Option<SetOps<K, V>>,
    pub(crate) len: usize,
    pub(crate) occupied: usize,
    pub(crate) version: u64,
    pub(crate) hash_fn: HashFn<K>,
    pub(crate) equal_fn: EqualFn<K>,
    pub(crate) key_destroy: Option<DestroyFn<K>>,
    pub(crate) value_destroy: Option<DestroyFn<V>>,
}

struct Entries<'a, K, V>(&'a HashTable<K, V>);

impl<K: Debug, V: Debug> Debug for Entries<'_, K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: Debug, V: Debug> Debug for HashTable<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field(
                "slots",
                &self
                    .slots
                    .iter()
                    .map(|slot| match slot {
                        Slot::Empty => String::from(".."),
                        Slot::Tombstone => String::from("xx"),
                        Slot::Occupied(hash) => format!("{:02x}", hash & 0xFF),
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            )
            .field("len", &self.len)
            .field("occupied", &self.occupied)
            .field("capacity", &self.capacity.slots())
            .field("aliased", &self.storage.is_aliased())
            .field("entries", &Entries(self))
            .finish()
    }
}

impl<K: Clone, V: Clone> Clone for HashTable<K, V> {
    fn clone(&self) -> Self {
        Self {
            id: next_table_id(),
            capacity: self.capacity,
            slots: self.slots.clone(),
            storage: self.storage.clone(),
            set_ops: self.set_ops,
            len: self.len,
            occupied: self.occupied,
            version: self.version,
            hash_fn: Arc::clone(&self.hash_fn),
            equal_fn: Arc::clone(&self.equal_fn),
            key_destroy: self.key_destroy.clone(),
            value_destroy: self.value_destroy.clone(),
        }
    }
}

impl<K, V> Drop for HashTable<K, V> {
    fn drop(&mut self) {
        if self.key_destroy.is_none() && self.value_destroy.is_none() {
            return;
        }

        for index in 0..self.slots.len() {
            if self.slots[index].is_occupied() {
                let carried = self.storage.take(index);
                self.evict(carried);
            }
        }
    }
}

impl<K: Eq, V> HashTable<K, V> {
    /// Creates an empty table that hashes keys with `hash_fn` and compares
    /// them with `==`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::HashTable;
    /// use probe_hash::hash_fns::str_hash;
    ///
    /// let mut table: HashTable<String, u32> = HashTable::new(str_hash::<String>);
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 8);
    /// ```
    pub fn new(hash_fn: impl Fn(&K) -> u64 + Send + Sync + 'static) -> Self {
        Self::builder(hash_fn).build()
    }
}

impl<K, V> HashTable<K, V> {
    pub(crate) fn try_from_parts(
        hash_fn: HashFn<K>,
        equal_fn: EqualFn<K>,
        key_destroy: Option<DestroyFn<K>>,
        value_destroy: Option<DestroyFn<V>>,
        set_ops: Option<SetOps<K, V>>,
    ) -> Result<Self> {
        let capacity = Capacity::MIN;
        Ok(Self {
            id: next_table_id(),
            capacity,
            slots: try_slots(capacity.slots())?,
            storage: Storage::try_new(set_ops.is_some(), capacity.slots())?,
            set_ops,
            len: 0,
            occupied: 0,
            version: 0,
            hash_fn,
            equal_fn,
            key_destroy,
            value_destroy,
        })
    }

    /// Creates an empty table with the same hash, equality and destroy
    /// functions as this one.
    ///
    /// Set-mode tables produce set-mode tables.
    pub fn new_similar(&self) -> Self {
        infallible(Self::try_from_parts(
            Arc::clone(&self.hash_fn),
            Arc::clone(&self.equal_fn),
            self.key_destroy.clone(),
            self.value_destroy.clone(),
            self.set_ops,
        ))
    }

    /// Returns the number of live entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::HashTable;
    /// use probe_hash::hash_fns::uint_hash;
    ///
    /// let mut table = HashTable::new(uint_hash);
    /// assert_eq!(table.len(), 0);
    /// table.insert(4, ());
    /// table.insert(4, ());
    /// assert_eq!(table.len(), 1);
    /// ```
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots currently allocated.
    ///
    /// Always a power of two, at least 8. The table grows once live entries
    /// and tombstones fill roughly 15/16 of the slots and shrinks once fewer
    /// than a quarter of them hold live entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.slots()
    }

    #[inline(always)]
    fn hash_of(&self, key: &K) -> u64 {
        coerce_hash((self.hash_fn)(key))
    }

    #[inline(always)]
    pub(crate) fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    fn lookup_slot(&self, hash: u64, key: &K) -> Lookup {
        let mut probe = Probe::start(self.capacity, hash);
        let mut tombstone = None;

        loop {
            match self.slots[probe.index] {
                Slot::Empty => return Lookup::Vacant(tombstone.unwrap_or(probe.index)),
                Slot::Tombstone => {
                    tombstone.get_or_insert(probe.index);
                }
                Slot::Occupied(stored) => {
                    if stored == hash
                        && self
                            .storage
                            .key(probe.index)
                            .is_some_and(|stored_key| (self.equal_fn)(stored_key, key))
                    {
                        return Lookup::Found(probe.index);
                    }
                }
            }

            probe.advance();
            if probe.exhausted() {
                unreachable!(
                    "probe walk covered all {} slots without reaching an empty one",
                    self.slots.len()
                );
            }
        }
    }

    #[inline]
    fn find_index(&self, key: &K) -> Option<usize> {
        match self.lookup_slot(self.hash_of(key), key) {
            Lookup::Found(index) => Some(index),
            Lookup::Vacant(_) => None,
        }
    }

    /// The live entry at `index`, if any.
    #[inline]
    pub(crate) fn entry_at(&self, index: usize) -> Option<(&K, &V)> {
        if !self.slots.get(index)?.is_occupied() {
            return None;
        }
        Some((
            self.storage.key(index)?,
            self.storage.value(index, self.set_ops.as_ref())?,
        ))
    }

    /// Hands discarded items to the destroy callbacks, or drops them.
    pub(crate) fn evict(&self, carried: Carried<K, V>) {
        if let (Some(key), Some(destroy)) = (carried.key, &self.key_destroy) {
            destroy(key);
        }
        if let (Some(value), Some(destroy)) = (carried.value, &self.value_destroy) {
            destroy(value);
        }
    }

    /// Turns a lifted entry into an owned pair, materializing the value of an
    /// aliased entry from its key.
    pub(crate) fn into_pair(&self, carried: Carried<K, V>) -> Option<(K, V)> {
        let key = carried.key?;
        let value = match carried.value {
            Some(value) => value,
            None => (self.set_ops?.to_value)(&key),
        };
        Some((key, value))
    }

    /// Marks `index` as a tombstone and lifts its entry out.
    pub(crate) fn remove_slot(&mut self, index: usize) -> Carried<K, V> {
        self.slots[index] = Slot::Tombstone;
        self.len -= 1;
        self.storage.take(index)
    }

    /// Gives a set-mode table its own value array, with room for `reserve`
    /// slots. Returns `true` if the storage was split by this call.
    pub(crate) fn try_split(&mut self, reserve: usize) -> Result<bool> {
        let (true, Some(ops)) = (self.storage.is_aliased(), self.set_ops) else {
            return Ok(false);
        };

        self.storage.try_split(ops.to_value, reserve)?;
        log::trace!(
            "split set storage into key and value arrays ({} slots)",
            self.slots.len()
        );
        Ok(true)
    }

    fn try_insert_entry(&mut self, key: K, value: Option<V>, keep_new_key: bool) -> Result<bool> {
        let hash = self.hash_of(&key);
        let mut lookup = self.lookup_slot(hash, &key);

        // Consuming an empty slot may cross the grow threshold.
        let grow_to = match lookup {
            Lookup::Vacant(index)
                if self.slots[index] == Slot::Empty && self.capacity.needs_grow(self.occupied + 1) =>
            {
                Some(Capacity::for_len(self.len + 1).ok_or(Error::CapacityOverflow)?)
            }
            _ => None,
        };

        // Split and grow both allocate before the write. A split whose grow
        // fails is undone, so on error the table is untouched.
        let split = value.is_some() && self.try_split(grow_to.map_or(0, Capacity::slots))?;
        if let Some(capacity) = grow_to {
            if let Err(err) = self.try_resize_to(capacity) {
                if split {
                    self.storage.unsplit();
                }
                return Err(err);
            }
            lookup = self.lookup_slot(hash, &key);
        }

        match lookup {
            Lookup::Found(index) => {
                let old_value = value.and_then(|value| self.storage.replace_value(index, value));
                let discarded_key = if keep_new_key {
                    self.storage.replace_key(index, key)
                } else {
                    Some(key)
                };

                self.evict(Carried {
                    key: discarded_key,
                    value: old_value,
                });
                Ok(false)
            }
            Lookup::Vacant(index) => {
                if self.slots[index] == Slot::Empty {
                    self.occupied += 1;
                }
                self.slots[index] = Slot::Occupied(hash);
                self.storage.replace_key(index, key);
                if let Some(value) = value {
                    self.storage.replace_value(index, value);
                }

                self.len += 1;
                self.bump_version();
                Ok(true)
            }
        }
    }

    /// Inserts a key-value pair.
    ///
    /// If the key is already present its value is replaced and the stored
    /// key is kept; the passed key and the old value go to the destroy
    /// callbacks. Returns `true` if a new entry was created.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::HashTable;
    /// use probe_hash::hash_fns::int_hash;
    ///
    /// let mut table = HashTable::new(int_hash);
    /// assert!(table.insert(7, "seven"));
    /// assert!(!table.insert(7, "SEVEN"));
    /// assert_eq!(table.lookup(&7), Some(&"SEVEN"));
    /// ```
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`](alloc::alloc::handle_alloc_error)
    /// if growing the table fails. Use [`try_insert`](Self::try_insert) to
    /// observe the failure instead.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        infallible(self.try_insert(key, value))
    }

    /// Fallible [`insert`](Self::insert).
    ///
    /// On error the table is unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<bool> {
        self.try_insert_entry(key, Some(value), false)
    }

    /// Like [`insert`](Self::insert), but an existing entry adopts the passed
    /// key and the stored key is discarded.
    pub fn replace(&mut self, key: K, value: V) -> bool {
        infallible(self.try_replace(key, value))
    }

    /// Fallible [`replace`](Self::replace).
    pub fn try_replace(&mut self, key: K, value: V) -> Result<bool> {
        self.try_insert_entry(key, Some(value), true)
    }

    /// Returns the value stored for `key`.
    #[inline]
    pub fn lookup(&self, key: &K) -> Option<&V> {
        self.lookup_extended(key).map(|(_, value)| value)
    }

    /// Returns `true` if `key` is present.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.find_index(key).is_some()
    }

    /// Returns the stored key and value for `key`.
    ///
    /// The stored key may be a different object than `key` that merely
    /// compares equal to it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::HashTable;
    /// use probe_hash::hash_fns::str_equal;
    /// use probe_hash::hash_fns::str_hash;
    ///
    /// let mut table = HashTable::builder_with_equal(str_hash::<String>, str_equal::<String>)
    ///     .build();
    /// table.insert("tz".to_string(), 3600);
    ///
    /// let (stored, offset) = table.lookup_extended(&"tz".to_string()).unwrap();
    /// assert_eq!(stored, "tz");
    /// assert_eq!(*offset, 3600);
    /// ```
    pub fn lookup_extended(&self, key: &K) -> Option<(&K, &V)> {
        let index = self.find_index(key)?;
        self.entry_at(index)
    }

    /// Removes `key`, handing its key and value to the destroy callbacks.
    ///
    /// Returns `false` if the key was absent.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(index) = self.find_index(key) else {
            return false;
        };

        let carried = self.remove_slot(index);
        self.bump_version();
        self.evict(carried);
        self.maybe_shrink();
        true
    }

    /// Removes `key` without calling the destroy callbacks.
    ///
    /// Returns `false` if the key was absent.
    pub fn steal(&mut self, key: &K) -> bool {
        self.steal_extended(key).is_some()
    }

    /// Removes `key` and returns the stored key and value without calling the
    /// destroy callbacks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::HashTable;
    /// use probe_hash::hash_fns::int_hash;
    ///
    /// let mut table = HashTable::new(int_hash);
    /// table.insert(1, String::from("one"));
    ///
    /// assert_eq!(table.steal_extended(&1), Some((1, String::from("one"))));
    /// assert_eq!(table.steal_extended(&1), None);
    /// ```
    pub fn steal_extended(&mut self, key: &K) -> Option<(K, V)> {
        let index = self.find_index(key)?;

        let carried = self.remove_slot(index);
        self.bump_version();
        let pair = self.into_pair(carried);
        self.maybe_shrink();
        pair
    }

    /// Removes every entry, handing each key and value to the destroy
    /// callbacks.
    ///
    /// When destroy callbacks are set the table first installs fresh minimum
    /// size storage and only then runs the callbacks over the old contents.
    pub fn remove_all(&mut self) {
        if self.len > 0 {
            self.bump_version();
        }
        self.clear_entries(true);
        self.maybe_shrink();
    }

    fn clear_entries(&mut self, notify: bool) {
        self.len = 0;
        self.occupied = 0;

        if !notify || (self.key_destroy.is_none() && self.value_destroy.is_none()) {
            self.slots.fill(Slot::Empty);
            self.storage.clear();
            // A cleared set goes back to a single array.
            if self.set_ops.is_some() {
                self.storage.unsplit();
            }
            return;
        }

        let capacity = Capacity::MIN;
        let slots = mem::replace(&mut self.slots, infallible(try_slots(capacity.slots())));
        let mut storage = mem::replace(
            &mut self.storage,
            infallible(Storage::try_new(self.set_ops.is_some(), capacity.slots())),
        );
        self.capacity = capacity;

        for (index, slot) in slots.iter().enumerate() {
            if slot.is_occupied() {
                self.evict(storage.take(index));
            }
        }
    }

    /// Lifts every live entry out of the table and empties it.
    fn take_all(&mut self, mut sink: impl FnMut(&Self, Carried<K, V>)) {
        if self.len > 0 {
            for index in 0..self.slots.len() {
                if self.slots[index].is_occupied() {
                    let carried = self.storage.take(index);
                    sink(self, carried);
                }
            }
            self.bump_version();
        }
        self.clear_entries(false);
        self.maybe_shrink();
    }

    /// Removes every entry and returns them without calling the destroy
    /// callbacks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::HashTable;
    /// use probe_hash::hash_fns::int_hash;
    ///
    /// let mut table = HashTable::new(int_hash);
    /// table.insert(1, 'a');
    /// table.insert(2, 'b');
    ///
    /// let mut pairs = table.steal_all();
    /// pairs.sort();
    /// assert_eq!(pairs, vec![(1, 'a'), (2, 'b')]);
    /// assert!(table.is_empty());
    /// ```
    pub fn steal_all(&mut self) -> Vec<(K, V)> {
        let mut pairs = Vec::with_capacity(self.len);
        self.take_all(|table, carried| pairs.extend(table.into_pair(carried)));
        pairs
    }

    /// Removes every entry, returning the keys and handing the values to the
    /// value destroy callback.
    pub fn steal_all_keys(&mut self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len);
        self.take_all(|table, Carried { key, value }| {
            keys.extend(key);
            table.evict(Carried { key: None, value });
        });
        keys
    }

    /// Removes every entry, returning the values and handing the keys to the
    /// key destroy callback.
    ///
    /// Set-mode entries that never had a separate value return their key as
    /// the value.
    pub fn steal_all_values(&mut self) -> Vec<V> {
        let mut values = Vec::with_capacity(self.len);
        self.take_all(|table, Carried { key, value }| match (value, table.set_ops) {
            (Some(value), _) => {
                values.push(value);
                table.evict(Carried { key, value: None });
            }
            (None, Some(ops)) => values.extend(key.map(ops.into_value)),
            (None, None) => table.evict(Carried { key, value: None }),
        });
        values
    }

    /// Calls `f` on every entry in storage order.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        for (key, value) in self.iter() {
            f(key, value);
        }
    }

    /// Returns the value of the first entry, in storage order, for which
    /// `predicate` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::HashTable;
    /// use probe_hash::hash_fns::int_hash;
    ///
    /// let mut table = HashTable::new(int_hash);
    /// table.insert(1, "odd");
    /// table.insert(2, "even");
    ///
    /// assert_eq!(table.find(|key, _| key % 2 == 0), Some(&"even"));
    /// assert_eq!(table.find(|key, _| *key > 2), None);
    /// ```
    pub fn find(&self, mut predicate: impl FnMut(&K, &V) -> bool) -> Option<&V> {
        self.iter()
            .find(|(key, value)| predicate(key, value))
            .map(|(_, value)| value)
    }

    fn remove_matching(&mut self, mut predicate: impl FnMut(&K, &V) -> bool, notify: bool) -> usize {
        let mut removed = 0;
        for index in 0..self.slots.len() {
            if self
                .entry_at(index)
                .is_some_and(|(key, value)| predicate(key, value))
            {
                let carried = self.remove_slot(index);
                if notify {
                    self.evict(carried);
                }
                removed += 1;
            }
        }

        if removed > 0 {
            self.bump_version();
        }
        self.maybe_shrink();
        removed
    }

    /// Removes every entry for which `predicate` returns `true`, handing the
    /// keys and values to the destroy callbacks.
    ///
    /// Returns the number of entries removed.
    pub fn foreach_remove(&mut self, predicate: impl FnMut(&K, &V) -> bool) -> usize {
        self.remove_matching(predicate, true)
    }

    /// Removes every entry for which `predicate` returns `true` without
    /// calling the destroy callbacks.
    ///
    /// Returns the number of entries removed.
    pub fn foreach_steal(&mut self, predicate: impl FnMut(&K, &V) -> bool) -> usize {
        self.remove_matching(predicate, false)
    }

    /// Returns an iterator over the entries in storage order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            table: self,
            index: 0,
            remaining: self.len,
        }
    }

    /// Returns an iterator over the keys in storage order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values in storage order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    fn maybe_shrink(&mut self) {
        if self.capacity.needs_shrink(self.len)
            && let Err(err) = self.try_resize(self.len)
        {
            log::warn!("skipping hash table shrink: {err}");
        }
    }

    /// Resizes the table for `len` live entries and rehashes in place.
    ///
    /// Every allocation happens before the first entry moves, so on error the
    /// table is untouched.
    fn try_resize(&mut self, len: usize) -> Result<()> {
        let capacity = Capacity::for_len(len).ok_or(Error::CapacityOverflow)?;
        self.try_resize_to(capacity)
    }

    fn try_resize_to(&mut self, capacity: Capacity) -> Result<()> {
        let old_slots = self.slots.len();
        let new_slots = capacity.slots();

        let mut placed = Bitmap::try_new(old_slots.max(new_slots))?;
        if new_slots > old_slots {
            try_reserve_to(&mut self.slots, new_slots)?;
            self.storage.try_grow(new_slots)?;
            self.slots.resize(new_slots, Slot::Empty);
        }

        log::trace!(
            "resizing hash table from {old_slots} to {new_slots} slots ({} live, {} tombstones)",
            self.len,
            self.occupied - self.len
        );

        self.capacity = capacity;
        self.rehash(old_slots, &mut placed);

        if new_slots < old_slots {
            self.slots.truncate(new_slots);
            self.slots.shrink_to_fit();
            self.storage.shrink(new_slots);
        }
        self.occupied = self.len;
        Ok(())
    }

    /// Moves every entry among the first `old_slots` slots to its position
    /// under the current capacity.
    ///
    /// Entries are followed along displacement chains: an entry is dropped
    /// into its target, and whatever occupied the target is carried on to its
    /// own target, until a chain ends in a free slot. `placed` marks slots that
    /// already hold their final entry.
    fn rehash(&mut self, old_slots: usize, placed: &mut Bitmap) {
        for index in 0..old_slots {
            let Slot::Occupied(hash) = self.slots[index] else {
                self.slots[index] = Slot::Empty;
                continue;
            };
            if placed.get(index) {
                continue;
            }

            self.slots[index] = Slot::Empty;
            let mut carried = self.storage.take(index);
            let mut carried_hash = hash;

            loop {
                let mut probe = Probe::start(self.capacity, carried_hash);
                while placed.get(probe.index) {
                    probe.advance();
                }

                let target = probe.index;
                placed.set(target);
                let evicted = mem::replace(&mut self.slots[target], Slot::Occupied(carried_hash));
                self.storage.swap(target, &mut carried);

                match evicted {
                    Slot::Occupied(hash) => carried_hash = hash,
                    Slot::Empty | Slot::Tombstone => break,
                }
            }
        }
    }
}

impl<K: Eq + Clone> HashTable<K, K> {
    /// Creates an empty set-mode table.
    ///
    /// Set-mode tables store each key once and report it as its own value
    /// until a distinct value is written, at which point the table keeps a
    /// separate value array.
    pub fn new_set(hash_fn: impl Fn(&K) -> u64 + Send + Sync + 'static) -> Self {
        Self::builder(hash_fn).build_set()
    }
}

impl<K: Clone> HashTable<K, K> {
    /// Adds `key` as both key and value.
    ///
    /// An existing entry adopts the passed key. Returns `true` if the key was
    /// not present before.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::HashTable;
    /// use probe_hash::hash_fns::str_hash;
    ///
    /// let mut names = HashTable::new_set(str_hash::<String>);
    /// assert!(names.add("UTC".to_string()));
    /// assert!(!names.add("UTC".to_string()));
    ///
    /// let utc = "UTC".to_string();
    /// assert_eq!(names.lookup(&utc), Some(&utc));
    /// ```
    pub fn add(&mut self, key: K) -> bool {
        infallible(self.try_add(key))
    }

    /// Fallible [`add`](Self::add).
    pub fn try_add(&mut self, key: K) -> Result<bool> {
        let value = if self.storage.is_aliased() {
            None
        } else {
            Some(key.clone())
        };
        self.try_insert_entry(key, value, true)
    }
}

/// An iterator over the entries of a [`HashTable`].
///
/// This struct is created by [`HashTable::iter`]. Entries are yielded in
/// storage order, which depends on the hash function and the insertion
/// history.
///
/// # Examples
///
/// ```rust
/// use probe_hash::HashTable;
/// use probe_hash::hash_fns::int_hash;
///
/// let mut table = HashTable::new(int_hash);
/// for i in 0..10 {
///     table.insert(i, i * i);
/// }
///
/// let sum: i32 = table.iter().map(|(_, square)| square).sum();
/// assert_eq!(sum, 285);
/// ```
pub struct Iter<'a, K, V> {
    table: &'a HashTable<K, V>,
    index: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.table.slots.len() {
            let index = self.index;
            self.index += 1;
            if let Some(entry) = self.table.entry_at(index) {
                self.remaining = self.remaining.saturating_sub(1);
                return Some(entry);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> core::iter::FusedIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a HashTable<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the keys of a [`HashTable`], created by
/// [`HashTable::keys`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// An iterator over the values of a [`HashTable`], created by
/// [`HashTable::values`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
