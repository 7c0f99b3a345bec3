//! A traversal position that survives mutation of the table it walks.

use crate::error::Error;
use crate::error::Result;
use crate::hash_table::HashTable;
use crate::storage::Carried;

/// A position in a [`HashTable`], created by [`HashTable::cursor`].
///
/// Unlike [`Iter`](crate::hash_table::Iter) a cursor does not borrow its
/// table. Every call takes the table explicitly, which lets the caller remove
/// or replace the current entry mid-walk. The cursor remembers the table's
/// version and refuses to continue with [`Error::VersionConflict`] if the
/// table was changed by anything other than the cursor itself. Passing a
/// different table than the one that created the cursor fails with
/// [`Error::ForeignCursor`]; clones count as different tables.
///
/// Removing through a cursor never resizes the table, so the walk stays
/// valid.
///
/// # Examples
///
/// ```rust
/// use probe_hash::HashTable;
/// use probe_hash::hash_fns::int_hash;
///
/// let mut table = HashTable::new(int_hash);
/// for i in 0..10 {
///     table.insert(i, i * 10);
/// }
///
/// let mut cursor = table.cursor();
/// while let Some((key, _)) = cursor.next(&table)? {
///     if key % 2 == 1 {
///         cursor.remove(&mut table)?;
///     }
/// }
///
/// assert_eq!(table.len(), 5);
/// # Ok::<(), probe_hash::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Identity of the table that created the cursor.
    table: usize,
    /// Slot of the current entry. `None` before the first call to `next`.
    position: Option<usize>,
    version: u64,
}

impl<K, V> HashTable<K, V> {
    /// Returns a cursor positioned before the first entry.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            table: self.id,
            position: None,
            version: self.version,
        }
    }
}

impl Cursor {
    fn check<K, V>(&self, table: &HashTable<K, V>) -> Result<()> {
        if self.table != table.id {
            log::error!("cursor of table {} used on table {}", self.table, table.id);
            return Err(Error::ForeignCursor);
        }
        if self.version != table.version {
            log::error!(
                "hash table modified during iteration: cursor holds version {}, table is at {}",
                self.version,
                table.version
            );
            return Err(Error::VersionConflict {
                expected: self.version,
                found: table.version,
            });
        }
        Ok(())
    }

    fn current<K, V>(&self, table: &HashTable<K, V>) -> Result<usize> {
        self.check(table)?;
        match self.position {
            Some(index) if table.entry_at(index).is_some() => Ok(index),
            _ => {
                log::warn!("cursor used without a current entry");
                Err(Error::NoCurrentEntry)
            }
        }
    }

    /// Advances to the next live entry and returns it, or `None` once every
    /// slot has been visited.
    pub fn next<'t, K, V>(&mut self, table: &'t HashTable<K, V>) -> Result<Option<(&'t K, &'t V)>> {
        self.check(table)?;

        let mut index = self.position.map_or(0, |position| position + 1);
        while index < table.slots.len() {
            if let Some(entry) = table.entry_at(index) {
                self.position = Some(index);
                return Ok(Some(entry));
            }
            index += 1;
        }

        self.position = Some(table.slots.len());
        Ok(None)
    }

    /// Removes the current entry, handing its key and value to the destroy
    /// callbacks.
    pub fn remove<K, V>(&mut self, table: &mut HashTable<K, V>) -> Result<()> {
        let index = self.current(table)?;

        let carried = table.remove_slot(index);
        table.bump_version();
        self.version = table.version;
        table.evict(carried);
        Ok(())
    }

    /// Removes the current entry and returns it without calling the destroy
    /// callbacks.
    pub fn steal<K, V>(&mut self, table: &mut HashTable<K, V>) -> Result<(K, V)> {
        let index = self.current(table)?;

        let carried = table.remove_slot(index);
        table.bump_version();
        self.version = table.version;
        match table.into_pair(carried) {
            Some(pair) => Ok(pair),
            None => unreachable!("live slot {index} held no entry"),
        }
    }

    /// Replaces the value of the current entry, keeping its key.
    ///
    /// The old value goes to the value destroy callback. On a set-mode table
    /// this splits the key and value storage, which may fail to allocate.
    pub fn replace_value<K, V>(&mut self, table: &mut HashTable<K, V>, value: V) -> Result<()> {
        let index = self.current(table)?;

        table.try_split(0)?;
        let old_value = table.storage.replace_value(index, value);
        table.bump_version();
        self.version = table.version;
        table.evict(Carried {
            key: None,
            value: old_value,
        });
        Ok(())
    }
}
