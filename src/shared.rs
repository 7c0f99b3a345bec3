//! Reference-counted handles to a table.

use alloc::boxed::Box;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::Deref;
use core::ptr::NonNull;

use crate::hash_table::HashTable;
use crate::ref_count::AtomicRefCount;

struct Shared<K, V> {
    refs: AtomicRefCount,
    table: HashTable<K, V>,
}

/// A counted reference to a heap-allocated [`HashTable`].
///
/// Handles are created with [`HashTable::into_shared`] and duplicated with
/// [`acquire`](Self::acquire) (or [`Clone`]). Dropping a handle, or calling
/// [`release`](Self::release), gives up its reference; the last one destroys
/// the table, running its destroy callbacks.
///
/// Handles give shared access to the table. Mutation requires the only
/// reference, see [`get_mut`](Self::get_mut).
///
/// # Examples
///
/// ```rust
/// use probe_hash::HashTable;
/// use probe_hash::hash_fns::int_hash;
///
/// let mut table = HashTable::new(int_hash);
/// table.insert(1, "one");
///
/// let mut shared = table.into_shared();
/// let other = shared.acquire();
/// assert_eq!(other.lookup(&1), Some(&"one"));
/// assert!(shared.get_mut().is_none());
///
/// assert!(!other.release());
/// shared.get_mut().unwrap().insert(2, "two");
/// assert_eq!(shared.len(), 2);
/// ```
pub struct TableRef<K, V> {
    ptr: NonNull<Shared<K, V>>,
    _marker: PhantomData<Shared<K, V>>,
}

// SAFETY: a handle only hands out `&HashTable` while other handles exist and
// `&mut HashTable` when it is the last one, the same contract as `Arc`.
unsafe impl<K, V> Send for TableRef<K, V> where HashTable<K, V>: Send + Sync {}

// SAFETY: see above.
unsafe impl<K, V> Sync for TableRef<K, V> where HashTable<K, V>: Send + Sync {}

impl<K, V> HashTable<K, V> {
    /// Moves the table to the heap behind a handle holding one reference.
    pub fn into_shared(self) -> TableRef<K, V> {
        let shared = Box::new(Shared {
            refs: AtomicRefCount::new(),
            table: self,
        });
        TableRef {
            ptr: NonNull::from(Box::leak(shared)),
            _marker: PhantomData,
        }
    }
}

impl<K, V> TableRef<K, V> {
    #[inline]
    fn shared(&self) -> &Shared<K, V> {
        // SAFETY: the allocation lives until the last handle releases it, and
        // this handle still holds a reference.
        unsafe { self.ptr.as_ref() }
    }

    /// Takes another reference to the same table.
    pub fn acquire(&self) -> Self {
        self.shared().refs.increment();
        Self {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }

    /// Gives up this reference, returning `true` if it was the last one and
    /// the table was destroyed.
    pub fn release(self) -> bool {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never used again.
        unsafe { this.release_in_place() }
    }

    /// # Safety
    ///
    /// The handle must not be used after this call.
    unsafe fn release_in_place(&self) -> bool {
        if !self.shared().refs.decrement() {
            return false;
        }
        // SAFETY: the count reached zero, so no other handle can observe the
        // allocation, which came from `Box::leak` in `into_shared`.
        drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
        true
    }

    /// Returns the table mutably if this is the only reference.
    pub fn get_mut(&mut self) -> Option<&mut HashTable<K, V>> {
        if !self.shared().refs.compare(1) {
            return None;
        }
        // SAFETY: a count of one means this handle is the sole owner, and
        // `&mut self` prevents it from being duplicated while the borrow lives.
        Some(unsafe { &mut (*self.ptr.as_ptr()).table })
    }

    /// Number of live handles to this table.
    pub fn ref_count(&self) -> usize {
        self.shared().refs.get()
    }

    /// Returns `true` if both handles refer to the same table.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        a.ptr == b.ptr
    }
}

impl<K, V> Deref for TableRef<K, V> {
    type Target = HashTable<K, V>;

    fn deref(&self) -> &HashTable<K, V> {
        &self.shared().table
    }
}

impl<K, V> Clone for TableRef<K, V> {
    fn clone(&self) -> Self {
        self.acquire()
    }
}

impl<K, V> Drop for TableRef<K, V> {
    fn drop(&mut self) {
        // SAFETY: called once, from drop.
        unsafe {
            self.release_in_place();
        }
    }
}

impl<K: core::fmt::Debug, V: core::fmt::Debug> core::fmt::Debug for TableRef<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TableRef")
            .field("refs", &self.ref_count())
            .field("table", &**self)
            .finish()
    }
}
