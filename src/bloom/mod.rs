//! Bloom filter primitives backing the threshold registries.
//!
//! A Bloom filter answers "might this element have been inserted?" in O(k)
//! atomic bit reads with no allocation, at the cost of a tunable
//! false-positive rate and no removal. That trade is exactly right for the
//! request path: a flagged key must never be forgotten (no false negatives),
//! while the occasional clean key treated as flagged only costs an extra
//! challenge downstream.

mod bits;
mod filter;
mod funnel;

pub use filter::{BloomFilter, HashStrategy};
pub use funnel::{BytesFunnel, Funnel, StringFunnel};
