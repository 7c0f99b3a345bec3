//! Table sizing and the triangular probe sequence.

/// Smallest table is `1 << MIN_SHIFT` slots.
pub(crate) const MIN_SHIFT: u32 = 3;

/// Largest prime not above `1 << shift`, indexed by `shift`.
///
/// Initial probe positions are reduced modulo these primes rather than masked,
/// which spreads digests with poor low bits (pointers, multiples of a stride)
/// over the whole table.
const PRIME_MOD: [u64; 32] = [
    1,          // 1 << 0
    2,          // 1 << 1
    3,          // 1 << 2
    7,          // 1 << 3
    13,         // 1 << 4
    31,         // 1 << 5
    61,         // 1 << 6
    127,        // 1 << 7
    251,        // 1 << 8
    509,        // 1 << 9
    1021,       // 1 << 10
    2039,       // 1 << 11
    4093,       // 1 << 12
    8191,       // 1 << 13
    16381,      // 1 << 14
    32749,      // 1 << 15
    65521,      // 1 << 16
    131071,     // 1 << 17
    262139,     // 1 << 18
    524287,     // 1 << 19
    1048573,    // 1 << 20
    2097143,    // 1 << 21
    4194301,    // 1 << 22
    8388593,    // 1 << 23
    16777213,   // 1 << 24
    33554393,   // 1 << 25
    67108859,   // 1 << 26
    134217689,  // 1 << 27
    268435399,  // 1 << 28
    536870909,  // 1 << 29
    1073741789, // 1 << 30
    2147483647, // 1 << 31
];

/// Largest supported shift.
pub(crate) const MAX_SHIFT: u32 = PRIME_MOD.len() as u32 - 1;

/// Digests 0 and 1 are folded onto 2, so every stored hash is at least 2.
#[inline(always)]
pub(crate) fn coerce_hash(hash: u64) -> u64 {
    if hash < 2 { 2 } else { hash }
}

/// Power-of-two table geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Capacity {
    shift: u32,
}

impl Capacity {
    pub(crate) const MIN: Capacity = Capacity { shift: MIN_SHIFT };

    /// Geometry sized for `len` live entries at roughly 75% load.
    ///
    /// Returns `None` when the table would exceed `1 << MAX_SHIFT` slots.
    pub(crate) fn for_len(len: usize) -> Option<Capacity> {
        let target = len.saturating_add(len / 3);
        let shift = (usize::BITS - target.leading_zeros()).max(MIN_SHIFT);
        (shift <= MAX_SHIFT).then_some(Capacity { shift })
    }

    #[inline(always)]
    pub(crate) fn slots(self) -> usize {
        1 << self.shift
    }

    #[inline(always)]
    pub(crate) fn mask(self) -> usize {
        self.slots() - 1
    }

    #[inline(always)]
    pub(crate) fn modulus(self) -> u64 {
        PRIME_MOD[self.shift as usize]
    }

    #[inline(always)]
    pub(crate) fn start(self, hash: u64) -> usize {
        (hash.wrapping_mul(11) % self.modulus()) as usize
    }

    /// `true` once live entries plus tombstones reach ~15/16 of the slots.
    #[inline(always)]
    pub(crate) fn needs_grow(self, occupied: usize) -> bool {
        self.slots() <= occupied + occupied / 16
    }

    /// `true` when fewer than a quarter of the slots hold live entries.
    #[inline(always)]
    pub(crate) fn needs_shrink(self, len: usize) -> bool {
        self.shift > MIN_SHIFT && self.slots() > len.saturating_mul(4)
    }
}

/// Triangular probe sequence: `start, start+1, start+3, start+6, ...`.
///
/// With a power-of-two table size the first `capacity` positions visit every
/// slot exactly once.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Probe {
    pub(crate) index: usize,
    pub(crate) step: usize,
    mask: usize,
}

impl Probe {
    #[inline(always)]
    pub(crate) fn start(capacity: Capacity, hash: u64) -> Probe {
        Probe {
            index: capacity.start(hash),
            step: 0,
            mask: capacity.mask(),
        }
    }

    #[inline(always)]
    pub(crate) fn advance(&mut self) {
        self.step += 1;
        self.index = (self.index + self.step) & self.mask;
    }

    /// `true` once the walk has visited every slot of the table.
    #[inline(always)]
    pub(crate) fn exhausted(&self) -> bool {
        self.step > self.mask
    }
}
