//! Lock-free bit array shared by concurrent readers and writers.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{BreakwaterError, Result};

const BITS_PER_WORD: u64 = 64;

/// Fixed-size bit array backed by atomic words.
///
/// Bits are only ever set, never cleared, so a `fetch_or` per word is enough
/// to keep concurrent writers consistent without any lock. The number of set
/// bits is tracked separately so saturation metrics stay O(1).
pub(crate) struct BitArray {
    words: Box<[AtomicU64]>,
    set_bits: AtomicU64,
}

impl BitArray {
    /// Allocate a bit array holding at least `bit_size` bits.
    ///
    /// The actual capacity is rounded up to a whole number of 64-bit words;
    /// `bit_size()` reports the rounded value, which is what index derivation
    /// must use.
    pub(crate) fn new(bit_size: u64) -> Result<Self> {
        if bit_size == 0 {
            return Err(BreakwaterError::InvalidBloomParameters(
                "bit size must be positive".to_string(),
            ));
        }

        let word_count = bit_size.div_ceil(BITS_PER_WORD);
        let word_count = usize::try_from(word_count).map_err(|_| {
            BreakwaterError::InvalidBloomParameters(format!(
                "bit size ({}) is too large for this platform",
                bit_size
            ))
        })?;

        let words = (0..word_count)
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            words,
            set_bits: AtomicU64::new(0),
        })
    }

    /// Total number of bits, always a multiple of 64.
    pub(crate) fn bit_size(&self) -> u64 {
        self.words.len() as u64 * BITS_PER_WORD
    }

    /// Number of bits currently set.
    pub(crate) fn bit_count(&self) -> u64 {
        self.set_bits.load(Ordering::Relaxed)
    }

    /// Set the bit at `index`. Returns `true` if the bit was previously unset.
    pub(crate) fn set(&self, index: u64) -> bool {
        let word = (index / BITS_PER_WORD) as usize;
        let mask = 1u64 << (index % BITS_PER_WORD);

        let previous = self.words[word].fetch_or(mask, Ordering::Relaxed);
        if previous & mask == 0 {
            self.set_bits.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Read the bit at `index`.
    pub(crate) fn get(&self, index: u64) -> bool {
        let word = (index / BITS_PER_WORD) as usize;
        let mask = 1u64 << (index % BITS_PER_WORD);
        self.words[word].load(Ordering::Relaxed) & mask != 0
    }
}
