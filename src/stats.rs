//! Inspection of table layout, enabled with the `stats` feature.

use alloc::vec;
use alloc::vec::Vec;

use crate::hash_table::HashTable;
use crate::probe::Probe;
use crate::storage::Slot;

/// Number of bins in [`HashTable::probe_histogram`]; the last one collects
/// every longer walk.
pub const HISTOGRAM_BINS: usize = 16;

/// Snapshot of a table's slot usage.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugStats {
    /// Number of live entries
    pub len: usize,
    /// Live entries plus tombstones
    pub occupied: usize,
    /// Slots holding a tombstone
    pub tombstones: usize,
    /// Total number of slots
    pub capacity: usize,
    /// Prime used to reduce digests to a start slot
    pub modulus: u64,
    /// Whether keys and values share one array
    pub aliased: bool,
    /// Live entries per slot
    pub load_factor: f64,
    /// Live entries and tombstones per slot
    pub occupancy: f64,
}

impl DebugStats {
    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Entries: {}/{} ({:.2}% load factor)",
            self.len,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Occupied: {} ({} tombstones, {:.2}% occupancy)",
            self.occupied,
            self.tombstones,
            self.occupancy * 100.0
        );
        println!("Modulus: {}", self.modulus);
        println!(
            "Storage: {}",
            if self.aliased { "aliased" } else { "split" }
        );
    }
}

impl<K, V> HashTable<K, V> {
    /// Returns slot usage statistics.
    pub fn debug_stats(&self) -> DebugStats {
        let capacity = self.capacity.slots();
        DebugStats {
            len: self.len,
            occupied: self.occupied,
            tombstones: self
                .slots
                .iter()
                .filter(|slot| **slot == Slot::Tombstone)
                .count(),
            capacity,
            modulus: self.capacity.modulus(),
            aliased: self.storage.is_aliased(),
            load_factor: self.len as f64 / capacity as f64,
            occupancy: self.occupied as f64 / capacity as f64,
        }
    }

    /// Computes a histogram of probe lengths.
    ///
    /// For each live entry, counts the probe steps between the entry's start
    /// slot and the slot it lives in. Bin `i` holds the number of entries found
    /// after `i` steps; the last bin also counts every longer walk.
    pub fn probe_histogram(&self) -> Vec<usize> {
        let mut hist = vec![0usize; HISTOGRAM_BINS];

        for (index, slot) in self.slots.iter().enumerate() {
            let Slot::Occupied(hash) = *slot else {
                continue;
            };

            let mut probe = Probe::start(self.capacity, hash);
            while probe.index != index && !probe.exhausted() {
                probe.advance();
            }
            hist[probe.step.min(HISTOGRAM_BINS - 1)] += 1;
        }

        hist
    }

    /// Pretty-prints the probe-length histogram as a horizontal bar chart.
    #[cfg(feature = "std")]
    pub fn print_probe_histogram(&self) {
        let hist = self.probe_histogram();
        let max = hist.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!("probe histogram ({} entries):", self.len);
        for (steps, &count) in hist.iter().enumerate() {
            let width = (count * max_bar).div_ceil(max);
            let label = if steps == HISTOGRAM_BINS - 1 {
                std::format!("{steps:>2}+")
            } else {
                std::format!("{steps:>3}")
            };
            println!("{label} | {:<max_bar$} {count}", "#".repeat(width));
        }
    }
}
