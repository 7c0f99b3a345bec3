//! Thread-safe reference counter.

use core::sync::atomic::AtomicUsize;
use core::sync::atomic::Ordering;
use core::sync::atomic::fence;

/// Counts above this are treated as a leak in progress.
const MAX_REFCOUNT: usize = isize::MAX as usize;

#[cold]
#[inline(never)]
fn saturated(count: usize) -> ! {
    log::error!("reference count saturated at {count}");
    // Unit tests unwind instead so the saturation path stays observable.
    #[cfg(all(feature = "std", not(test)))]
    std::process::abort();
    #[cfg(not(all(feature = "std", not(test))))]
    panic!("reference count saturated at {count}");
}

/// An atomic reference count starting at one.
///
/// Increments are relaxed. The decrement that reaches zero synchronizes with
/// every earlier decrement, so the owner that observes zero may tear down the
/// shared value.
///
/// # Examples
///
/// ```rust
/// use probe_hash::AtomicRefCount;
///
/// let count = AtomicRefCount::new();
/// count.increment();
/// assert!(count.compare(2));
/// assert!(!count.decrement());
/// assert!(count.decrement());
/// ```
#[derive(Debug)]
pub struct AtomicRefCount(AtomicUsize);

impl Default for AtomicRefCount {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicRefCount {
    /// A counter holding a single reference.
    pub const fn new() -> Self {
        Self(AtomicUsize::new(1))
    }

    /// Adds a reference.
    ///
    /// # Panics
    ///
    /// Aborts the process (or panics without the `std` feature) if the count
    /// is saturated.
    #[inline]
    pub fn increment(&self) {
        let old = self.0.fetch_add(1, Ordering::Relaxed);
        debug_assert!(old > 0, "increment of a released reference count");
        if old >= MAX_REFCOUNT {
            saturated(old);
        }
    }

    /// Drops a reference, returning `true` if it was the last one.
    #[inline]
    pub fn decrement(&self) -> bool {
        let old = self.0.fetch_sub(1, Ordering::Release);
        debug_assert!(old > 0, "decrement of a released reference count");
        if old != 1 {
            return false;
        }
        fence(Ordering::Acquire);
        true
    }

    /// Returns `true` if exactly `count` references are held.
    #[inline]
    pub fn compare(&self, count: usize) -> bool {
        self.0.load(Ordering::Acquire) == count
    }

    /// Current number of references.
    #[inline]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_up_and_down() {
        let count = AtomicRefCount::default();
        assert_eq!(count.get(), 1);
        count.increment();
        count.increment();
        assert!(count.compare(3));
        assert!(!count.decrement());
        assert!(!count.decrement());
        assert!(count.compare(1));
        assert!(count.decrement());
        assert_eq!(count.get(), 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn exactly_one_thread_observes_zero() {
        use std::sync::Arc;
        use std::sync::atomic::AtomicUsize;
        use std::thread;

        let count = Arc::new(AtomicRefCount::new());
        let zeroes = Arc::new(AtomicUsize::new(0));
        for _ in 0..7 {
            count.increment();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let count = Arc::clone(&count);
                let zeroes = Arc::clone(&zeroes);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        count.increment();
                        assert!(!count.decrement());
                    }
                    if count.decrement() {
                        zeroes.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(zeroes.load(Ordering::Relaxed), 1);
    }

    #[test]
    #[should_panic(expected = "reference count saturated")]
    fn saturation_is_fatal() {
        let count = AtomicRefCount(AtomicUsize::new(MAX_REFCOUNT));
        count.increment();
    }
}
