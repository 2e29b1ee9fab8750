//! Funnels translate elements into the byte stream hashed by the filter.

use std::hash::Hasher;

/// Deterministic mapping from an element to the bytes the filter hashes.
///
/// Implementations must be pure: the same element must always pour the same
/// bytes, across calls and across filter instances, or membership answers
/// become meaningless. Two filters are only mergeable when their funnels
/// compare equal, so funnels are usually unit structs deriving `PartialEq`.
pub trait Funnel<T: ?Sized>: Send + Sync {
    /// Feed the element's canonical byte representation into `sink`.
    fn pour<H: Hasher>(&self, item: &T, sink: &mut H);
}

/// Funnel for string keys, hashing their UTF-8 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringFunnel;

impl Funnel<str> for StringFunnel {
    fn pour<H: Hasher>(&self, item: &str, sink: &mut H) {
        sink.write(item.as_bytes());
    }
}

impl Funnel<String> for StringFunnel {
    fn pour<H: Hasher>(&self, item: &String, sink: &mut H) {
        sink.write(item.as_bytes());
    }
}

/// Funnel for raw byte keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BytesFunnel;

impl Funnel<[u8]> for BytesFunnel {
    fn pour<H: Hasher>(&self, item: &[u8], sink: &mut H) {
        sink.write(item);
    }
}
