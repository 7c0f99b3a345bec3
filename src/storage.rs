//! Slot status and key/value storage.
//!
//! A table keeps three parallel arrays: one [`Slot`] per position, the keys,
//! and the values. Set-mode tables store each entry's value as its key and
//! therefore keep a single array ([`Storage::Aliased`]) until a value that is
//! not its own key is written, at which point the value array is split off.

use alloc::vec::Vec;
use core::alloc::Layout;

use crate::error::Error;
use crate::error::Result;

/// Per-slot status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    /// Never used since the last rehash; terminates probe walks.
    Empty,
    /// Held an entry that was removed; probe walks continue past it.
    Tombstone,
    /// Holds a live entry with this (coerced) hash.
    Occupied(u64),
}

impl Slot {
    #[inline(always)]
    pub(crate) fn is_occupied(self) -> bool {
        matches!(self, Slot::Occupied(_))
    }
}

/// Conversions that let a `HashTable<K, K>` hand out its keys as values.
pub(crate) struct SetOps<K, V> {
    pub(crate) as_value: fn(&K) -> &V,
    pub(crate) to_value: fn(&K) -> V,
    pub(crate) into_value: fn(K) -> V,
}

impl<K, V> Clone for SetOps<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for SetOps<K, V> {}

/// Key and value arrays.
#[derive(Clone)]
pub(crate) enum Storage<K, V> {
    /// Set mode: the value of every entry is its key.
    Aliased(Vec<Option<K>>),
    /// Independent key and value arrays.
    Split(Vec<Option<K>>, Vec<Option<V>>),
}

/// An entry lifted out of the arrays. `value` is always `None` for aliased
/// storage.
pub(crate) struct Carried<K, V> {
    pub(crate) key: Option<K>,
    pub(crate) value: Option<V>,
}

/// Allocates a vector of `len` `None`s, reporting allocation failure.
pub(crate) fn try_empty_vec<T>(len: usize) -> Result<Vec<Option<T>>> {
    let mut vec = Vec::new();
    try_reserve_to(&mut vec, len)?;
    vec.resize_with(len, || None);
    Ok(vec)
}

/// Makes room for `len` elements in `vec` without changing its length.
pub(crate) fn try_reserve_to<T>(vec: &mut Vec<T>, len: usize) -> Result<()> {
    if len > vec.len() {
        vec.try_reserve_exact(len - vec.len())
            .map_err(|_| match Layout::array::<T>(len) {
                Ok(layout) => Error::AllocFailed { layout },
                Err(_) => Error::CapacityOverflow,
            })?;
    }
    Ok(())
}

impl<K, V> Storage<K, V> {
    pub(crate) fn try_new(aliased: bool, slots: usize) -> Result<Self> {
        if aliased {
            Ok(Storage::Aliased(try_empty_vec(slots)?))
        } else {
            Ok(Storage::Split(try_empty_vec(slots)?, try_empty_vec(slots)?))
        }
    }

    #[inline(always)]
    pub(crate) fn is_aliased(&self) -> bool {
        matches!(self, Storage::Aliased(_))
    }

    #[inline(always)]
    pub(crate) fn key(&self, index: usize) -> Option<&K> {
        match self {
            Storage::Aliased(keys) | Storage::Split(keys, _) => keys[index].as_ref(),
        }
    }

    #[inline(always)]
    pub(crate) fn value<'a>(&'a self, index: usize, ops: Option<&SetOps<K, V>>) -> Option<&'a V> {
        match self {
            Storage::Aliased(keys) => {
                let ops = ops?;
                keys[index].as_ref().map(ops.as_value)
            }
            Storage::Split(_, values) => values[index].as_ref(),
        }
    }

    /// Lifts the entry at `index` out of the arrays.
    #[inline]
    pub(crate) fn take(&mut self, index: usize) -> Carried<K, V> {
        match self {
            Storage::Aliased(keys) => Carried {
                key: keys[index].take(),
                value: None,
            },
            Storage::Split(keys, values) => Carried {
                key: keys[index].take(),
                value: values[index].take(),
            },
        }
    }

    /// Exchanges the entry at `index` with `carried`.
    #[inline]
    pub(crate) fn swap(&mut self, index: usize, carried: &mut Carried<K, V>) {
        match self {
            Storage::Aliased(keys) => core::mem::swap(&mut keys[index], &mut carried.key),
            Storage::Split(keys, values) => {
                core::mem::swap(&mut keys[index], &mut carried.key);
                core::mem::swap(&mut values[index], &mut carried.value);
            }
        }
    }

    /// Replaces the key at `index`, returning the previous one.
    #[inline]
    pub(crate) fn replace_key(&mut self, index: usize, key: K) -> Option<K> {
        match self {
            Storage::Aliased(keys) | Storage::Split(keys, _) => keys[index].replace(key),
        }
    }

    /// Replaces the value at `index`, returning the previous one.
    ///
    /// Must only be called on split storage.
    #[inline]
    pub(crate) fn replace_value(&mut self, index: usize, value: V) -> Option<V> {
        match self {
            Storage::Aliased(_) => unreachable!("value written into aliased storage"),
            Storage::Split(_, values) => values[index].replace(value),
        }
    }

    /// Copies the key array into a fresh value array with room for at least
    /// `reserve` slots.
    ///
    /// On allocation failure the storage is left aliased.
    pub(crate) fn try_split(&mut self, to_value: fn(&K) -> V, reserve: usize) -> Result<()> {
        if let Storage::Aliased(keys) = self {
            let mut values: Vec<Option<V>> = Vec::new();
            try_reserve_to(&mut values, keys.len().max(reserve))?;
            values.extend(keys.iter().map(|key| key.as_ref().map(to_value)));

            let keys = core::mem::take(keys);
            *self = Storage::Split(keys, values);
        }
        Ok(())
    }

    /// Drops the value array and goes back to aliased storage.
    ///
    /// Only valid while every value is a copy of its key or absent.
    pub(crate) fn unsplit(&mut self) {
        if let Storage::Split(keys, _) = self {
            let keys = core::mem::take(keys);
            *self = Storage::Aliased(keys);
        }
    }

    /// Grows both arrays to `slots`, filling the tail with `None`.
    ///
    /// Either both arrays grow or neither does.
    pub(crate) fn try_grow(&mut self, slots: usize) -> Result<()> {
        match self {
            Storage::Aliased(keys) => {
                try_reserve_to(keys, slots)?;
                keys.resize_with(slots, || None);
            }
            Storage::Split(keys, values) => {
                try_reserve_to(keys, slots)?;
                try_reserve_to(values, slots)?;
                keys.resize_with(slots, || None);
                values.resize_with(slots, || None);
            }
        }
        Ok(())
    }

    /// Truncates both arrays to `slots` and releases the excess memory.
    pub(crate) fn shrink(&mut self, slots: usize) {
        match self {
            Storage::Aliased(keys) => {
                keys.truncate(slots);
                keys.shrink_to_fit();
            }
            Storage::Split(keys, values) => {
                keys.truncate(slots);
                keys.shrink_to_fit();
                values.truncate(slots);
                values.shrink_to_fit();
            }
        }
    }

    /// Drops every key and value in place.
    pub(crate) fn clear(&mut self) {
        match self {
            Storage::Aliased(keys) => keys.iter_mut().for_each(|key| *key = None),
            Storage::Split(keys, values) => {
                keys.iter_mut().for_each(|key| *key = None);
                values.iter_mut().for_each(|value| *value = None);
            }
        }
    }

    /// Number of slots.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        match self {
            Storage::Aliased(keys) | Storage::Split(keys, _) => keys.len(),
        }
    }
}

/// One bit per slot, marking slots that received their final entry during a
/// rehash pass.
pub(crate) struct Bitmap(Vec<u64>);

impl Bitmap {
    pub(crate) fn try_new(bits: usize) -> Result<Self> {
        let words = bits.div_ceil(64);
        let mut vec = Vec::new();
        try_reserve_to(&mut vec, words)?;
        vec.resize(words, 0);
        Ok(Bitmap(vec))
    }

    #[inline(always)]
    pub(crate) fn get(&self, index: usize) -> bool {
        self.0[index / 64] & (1 << (index % 64)) != 0
    }

    #[inline(always)]
    pub(crate) fn set(&mut self, index: usize) {
        self.0[index / 64] |= 1 << (index % 64);
    }
}
