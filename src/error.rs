use core::alloc::Layout;

/// Errors reported by [`HashTable`](crate::HashTable) and
/// [`Cursor`](crate::Cursor) operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The allocator could not provide memory for the slot arrays.
    ///
    /// The table is left unchanged and can still be used.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocFailed {
        /// Layout of the allocation that failed.
        layout: Layout,
    },

    /// The requested number of slots cannot be represented.
    #[error("hash table capacity overflow")]
    CapacityOverflow,

    /// The table was structurally modified behind a cursor's back.
    ///
    /// Continuing the traversal would observe slots in an undefined order, so
    /// the cursor refuses to proceed.
    #[error("hash table was modified during iteration (cursor version {expected}, table version {found})")]
    VersionConflict {
        /// Version captured by the cursor.
        expected: u64,
        /// Version of the table when the cursor was used.
        found: u64,
    },

    /// The cursor was created by a different table than the one it was used
    /// on.
    #[error("cursor used on a table other than the one that created it")]
    ForeignCursor,

    /// The cursor is not positioned on a live entry.
    #[error("cursor is not positioned on a live entry")]
    NoCurrentEntry,
}

/// Result type used by fallible table operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Routes allocation failures of the infallible API the same way the standard
/// collections do.
#[inline]
pub(crate) fn infallible<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(Error::AllocFailed { layout }) => alloc::alloc::handle_alloc_error(layout),
        Err(Error::CapacityOverflow) => panic!("hash table capacity overflow"),
        Err(err) => unreachable!("unexpected error from allocation path: {err}"),
    }
}
