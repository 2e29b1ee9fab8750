//! Registries of keys currently flagged as over threshold.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::bloom::{BloomFilter, StringFunnel};
use crate::error::Result;

/// The set of keys of one detection dimension currently flagged as over
/// threshold.
///
/// Wraps a dedicated Bloom filter sized for the dimension's expected
/// cardinality, decoupling the per-login threshold computation from the
/// per-request membership check: rules populate the registry through the
/// event consumers, while request filters call [`contains`] on every request
/// without touching any counter.
///
/// `contains` never fails and returns `false` for any key never inserted,
/// up to the configured false-positive probability. Keys are never removed;
/// a flagged key stays flagged for the registry's lifetime.
///
/// [`contains`]: ThresholdRegistry::contains
pub struct ThresholdRegistry {
    name: String,
    filter: BloomFilter<str, StringFunnel>,
}

impl ThresholdRegistry {
    /// Create a registry sized for `expected_insertions` flagged keys at the
    /// target false-positive probability.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error when the Bloom filter parameters are
    /// invalid; a registry that cannot be sized must abort startup.
    pub fn new(name: impl Into<String>, expected_insertions: u64, fpp: f64) -> Result<Self> {
        let name = name.into();
        let filter = BloomFilter::create(StringFunnel, expected_insertions, fpp)?;

        tracing::info!(
            target: "breakwater.registry.created",
            registry = %name,
            expected_insertions,
            fpp,
            bits = filter.bit_size(),
            hash_functions = filter.num_hash_functions(),
            "Threshold registry created"
        );

        Ok(Self { name, filter })
    }

    /// Flag a key as over threshold. Idempotent; redundant puts are harmless.
    pub fn put(&self, key: &str) {
        if self.filter.put(key) {
            tracing::debug!(
                target: "breakwater.registry.flagged",
                registry = %self.name,
                key = %key,
                "Key flagged as over threshold"
            );
        }
    }

    /// Whether the key is currently flagged. Hot-path read: O(k) atomic bit
    /// loads, no allocation, never fails.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.filter.might_contain(key)
    }

    /// The registry's dimension name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current false-positive probability given the filter's saturation.
    #[must_use]
    pub fn expected_fpp(&self) -> f64 {
        self.filter.expected_fpp()
    }

    /// Estimate of distinct keys flagged so far.
    #[must_use]
    pub fn approximate_flagged_count(&self) -> u64 {
        self.filter.approximate_element_count()
    }
}

/// Process-wide credential-stuffing state.
///
/// Raised when the aggregate rule fires; request filters read it to decide
/// whether the whole login surface is under a distributed attack. Stays
/// raised until [`reset`] is called.
///
/// [`reset`]: CredentialStuffingStatus::reset
#[derive(Debug, Default)]
pub struct CredentialStuffingStatus {
    active: AtomicBool,
}

impl CredentialStuffingStatus {
    /// Create an inactive status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark credential stuffing as active.
    pub fn activate(&self) {
        if !self.active.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                target: "breakwater.detection.credential_stuffing",
                "Global credential stuffing detected"
            );
        }
    }

    /// Clear the active flag.
    pub fn reset(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    /// Whether credential stuffing is currently flagged as active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}
