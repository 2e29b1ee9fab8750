//! Probabilistic set membership with a bounded false-positive rate.

use std::hash::{BuildHasher, Hasher};
use std::marker::PhantomData;

use ahash::RandomState;

use crate::bloom::bits::BitArray;
use crate::bloom::funnel::Funnel;
use crate::error::{BreakwaterError, Result};

/// Upper bound on hash functions per element.
const MAX_HASH_FUNCTIONS: u32 = 255;

// Fixed seeds so every filter instance derives identical bit indexes for the
// same element; funnels plus these seeds are the whole hash strategy.
const SEED_H1: (u64, u64, u64, u64) = (
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);
const SEED_H2: (u64, u64, u64, u64) = (
    0x4528_21e6_38d0_1377,
    0xbe54_66cf_34e9_0c6c,
    0xc0ac_29b7_c97c_50dd,
    0x3f84_d5b5_b547_0917,
);

/// Strategy used to derive `num_hash_functions` bit indexes per element.
///
/// Only one scheme is currently defined: two independent 64-bit hashes of the
/// funneled bytes, combined as `h1 + i * h2`. Kept as an enum so compatibility
/// checks and any future encodings have an explicit identity to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStrategy {
    DoubleHashing,
}

impl HashStrategy {
    fn hash_pair<T: ?Sized, F: Funnel<T>>(&self, funnel: &F, item: &T) -> (u64, u64) {
        match self {
            HashStrategy::DoubleHashing => {
                let (a0, a1, a2, a3) = SEED_H1;
                let (b0, b1, b2, b3) = SEED_H2;

                let mut h1 = RandomState::with_seeds(a0, a1, a2, a3).build_hasher();
                funnel.pour(item, &mut h1);

                let mut h2 = RandomState::with_seeds(b0, b1, b2, b3).build_hasher();
                funnel.pour(item, &mut h2);

                (h1.finish(), h2.finish())
            }
        }
    }
}

/// A Bloom filter over elements of type `T`.
///
/// Offers an approximate containment test with one-sided error: if it claims
/// an element is *not* contained, that is definitely true; if it claims an
/// element is contained, it might be wrong with probability bounded by the
/// `fpp` the filter was sized for.
///
/// Bits are set through atomic word operations, so any number of threads may
/// `put` and `might_contain` concurrently without locking. Once set, a bit is
/// never cleared: an inserted element can never be reported absent.
///
/// # Example
///
/// ```rust
/// use breakwater::bloom::{BloomFilter, StringFunnel};
///
/// let filter: BloomFilter<str, StringFunnel> =
///     BloomFilter::create(StringFunnel, 10_000, 0.01).unwrap();
///
/// filter.put("198.51.100.7");
/// assert!(filter.might_contain("198.51.100.7"));
/// ```
pub struct BloomFilter<T: ?Sized, F: Funnel<T>> {
    bits: BitArray,
    num_hash_functions: u32,
    funnel: F,
    strategy: HashStrategy,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized, F: Funnel<T>> BloomFilter<T, F> {
    /// Create a filter sized for `expected_insertions` elements at the target
    /// false-positive probability `fpp`.
    ///
    /// Sizing is fixed at construction; inserting significantly more elements
    /// than expected saturates the filter and degrades `fpp` sharply.
    ///
    /// # Errors
    ///
    /// Returns [`BreakwaterError::InvalidBloomParameters`] when `fpp` is not
    /// in `(0, 1)` or the derived geometry is invalid.
    pub fn create(funnel: F, expected_insertions: u64, fpp: f64) -> Result<Self> {
        if !(fpp > 0.0 && fpp < 1.0) {
            return Err(BreakwaterError::InvalidBloomParameters(format!(
                "false positive probability ({}) must be in (0, 1)",
                fpp
            )));
        }

        // A filter sized for zero insertions still needs valid geometry.
        let expected_insertions = expected_insertions.max(1);

        let num_bits = optimal_num_of_bits(expected_insertions, fpp);
        let num_hash_functions = optimal_num_of_hash_functions(expected_insertions, num_bits);

        Self::with_geometry(funnel, num_hash_functions, num_bits)
    }

    /// Create a filter from explicit geometry instead of `(n, p)` sizing.
    pub fn with_geometry(funnel: F, num_hash_functions: u32, bit_size: u64) -> Result<Self> {
        if num_hash_functions < 1 || num_hash_functions > MAX_HASH_FUNCTIONS {
            return Err(BreakwaterError::InvalidBloomParameters(format!(
                "numHashFunctions ({}) must be in [1, 255]",
                num_hash_functions
            )));
        }

        Ok(Self {
            bits: BitArray::new(bit_size)?,
            num_hash_functions,
            funnel,
            strategy: HashStrategy::DoubleHashing,
            _marker: PhantomData,
        })
    }

    /// Insert an element.
    ///
    /// Ensures every subsequent `might_contain` for the same element returns
    /// `true`. The returned boolean is `true` if any of the element's bits was
    /// previously unset, a definite first insertion. Under concurrent `put`s
    /// of the same element the boolean is advisory, not authoritative.
    pub fn put(&self, item: &T) -> bool {
        let (h1, h2) = self.strategy.hash_pair(&self.funnel, item);
        let bit_size = self.bits.bit_size();

        let mut combined = h1;
        let mut bits_changed = false;
        for _ in 0..self.num_hash_functions {
            let index = (combined & i64::MAX as u64) % bit_size;
            bits_changed |= self.bits.set(index);
            combined = combined.wrapping_add(h2);
        }
        bits_changed
    }

    /// Test whether an element might have been inserted.
    ///
    /// `true` means "possibly present" (all derived bits set); `false` means
    /// "definitely never inserted".
    pub fn might_contain(&self, item: &T) -> bool {
        let (h1, h2) = self.strategy.hash_pair(&self.funnel, item);
        let bit_size = self.bits.bit_size();

        let mut combined = h1;
        for _ in 0..self.num_hash_functions {
            let index = (combined & i64::MAX as u64) % bit_size;
            if !self.bits.get(index) {
                return false;
            }
            combined = combined.wrapping_add(h2);
        }
        true
    }

    /// Probability that `might_contain` wrongly answers `true` for an element
    /// that was never inserted, given the current saturation.
    pub fn expected_fpp(&self) -> f64 {
        let fraction = self.bits.bit_count() as f64 / self.bits.bit_size() as f64;
        fraction.powi(self.num_hash_functions as i32)
    }

    /// Estimate of the number of distinct elements inserted so far.
    ///
    /// Reasonably accurate while the filter stays below its sized capacity.
    pub fn approximate_element_count(&self) -> u64 {
        let bit_size = self.bits.bit_size() as f64;
        let fraction = self.bits.bit_count() as f64 / bit_size;

        // -ln(1 - fraction) * m / k, rounded half-up
        let estimate = -(-fraction).ln_1p() * bit_size / self.num_hash_functions as f64;
        estimate.round() as u64
    }

    /// Number of bits in the underlying array (a multiple of 64).
    pub fn bit_size(&self) -> u64 {
        self.bits.bit_size()
    }

    /// Number of hash functions applied per element.
    pub fn num_hash_functions(&self) -> u32 {
        self.num_hash_functions
    }
}

impl<T: ?Sized, F: Funnel<T> + PartialEq> BloomFilter<T, F> {
    /// Whether `other` could be merged into this filter.
    ///
    /// Requires a different instance with the same hash function count, the
    /// same bit size, the same hash strategy, and an equal funnel.
    pub fn is_compatible(&self, other: &Self) -> bool {
        !std::ptr::eq(self, other)
            && self.num_hash_functions == other.num_hash_functions
            && self.bits.bit_size() == other.bits.bit_size()
            && self.strategy == other.strategy
            && self.funnel == other.funnel
    }
}

// Cheat sheet:
//
// m: total bits
// n: expected insertions
// p: expected false positive probability
//
// 1) Optimal k = (m / n) * ln 2
// 2) For optimal k: m = -n * ln p / (ln 2)^2

/// Total bits needed to hold `n` insertions at false-positive probability `p`.
pub(crate) fn optimal_num_of_bits(n: u64, p: f64) -> u64 {
    let p = if p == 0.0 { f64::MIN_POSITIVE } else { p };
    let bits = -(n as f64) * p.ln() / (std::f64::consts::LN_2 * std::f64::consts::LN_2);
    bits.ceil() as u64
}

/// Optimal hash function count for `n` insertions into `m` bits.
pub(crate) fn optimal_num_of_hash_functions(n: u64, m: u64) -> u32 {
    // (m / n) * ln 2, computed in floating point to avoid truncation
    let k = (m as f64 / n as f64 * std::f64::consts::LN_2).round();
    (k as u32).max(1)
}
