//! Fixed-width bit vector used for sharer sets.

/// A bit vector with a fixed number of addressable bits.
///
/// Bits beyond `len` are never set. `count()` is maintained incrementally so
/// sharer counts are O(1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
    count: usize,
}

impl BitVector {
    /// Creates an all-clear vector of `len` bits.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
            count: 0,
        }
    }

    /// Number of addressable bits.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no bit is set.
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of set bits.
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns bit `idx`; out-of-range bits read as clear.
    pub fn at(&self, idx: usize) -> bool {
        idx < self.len && self.words[idx / 64] & (1 << (idx % 64)) != 0
    }

    /// Sets bit `idx`. Returns `false` if `idx` is out of range.
    pub fn set(&mut self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        if !self.at(idx) {
            self.words[idx / 64] |= 1 << (idx % 64);
            self.count += 1;
        }
        true
    }

    /// Clears bit `idx`. Returns whether the bit was previously set.
    pub fn clear(&mut self, idx: usize) -> bool {
        if !self.at(idx) {
            return false;
        }
        self.words[idx / 64] &= !(1 << (idx % 64));
        self.count -= 1;
        true
    }

    /// Clears every bit.
    pub fn reset(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
        self.count = 0;
    }

    /// Lowest set bit, if any.
    pub fn first(&self) -> Option<usize> {
        self.iter().next()
    }

    /// Iterates set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(w * 64 + tz)
            })
        })
    }
}
