#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod builder;
mod error;
mod probe;
mod storage;

pub mod cursor;

pub mod hash_fns;

/// The table engine and its borrowing iterators.
pub mod hash_table;

mod ref_count;

pub mod shared;

#[cfg(feature = "stats")]
pub mod stats;

pub use builder::Builder;
pub use cursor::Cursor;
pub use error::Error;
pub use error::Result;
pub use hash_table::HashTable;
pub use ref_count::AtomicRefCount;
pub use shared::TableRef;
