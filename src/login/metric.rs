//! Read-only view over a failure counter.

/// Read side of a login counter.
///
/// Rules depend on this trait rather than on [`RollingCounter`] directly, so
/// tests can script metric values and alternative backings stay possible.
///
/// [`RollingCounter`]: crate::login::RollingCounter
pub trait LoginMetric: Send + Sync {
    /// Current in-window count for the key; `0` for unseen keys. Never fails.
    fn value(&self, key: &str) -> u64;
}
