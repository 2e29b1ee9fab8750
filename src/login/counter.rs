//! Sliding-window failure counter with bounded memory.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::login::metric::LoginMetric;

/// Slots per key. The window is divided evenly across these; a finer ring
/// tracks the trailing window more closely at the cost of per-key memory.
const SLOTS: usize = 64;

/// Evict idle keys every N operations to prevent unbounded memory growth.
/// This is a balance between memory efficiency and performance overhead.
const SHRINK_INTERVAL: u64 = 1000;

#[derive(Default)]
struct Slot {
    /// Which window turn this slot currently holds counts for.
    epoch: AtomicU64,
    count: AtomicU64,
}

struct SlotRing {
    slots: [Slot; SLOTS],
    /// Millisecond clock reading of the last mutation, for idle eviction.
    last_touch: AtomicU64,
}

impl SlotRing {
    fn new(now: u64) -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::default()),
            last_touch: AtomicU64::new(now),
        }
    }
}

/// Per-key counter reflecting only activity within a trailing window.
///
/// Storage is a [`DashMap`] so increments to distinct keys land on different
/// shards and never serialize against each other. Each key owns a fixed ring
/// of time slots: an increment lands in the slot for the current epoch,
/// lazily reclaiming slots whose epoch fell out of the window, and a read
/// sums the in-window slots. Memory is bounded by the number of keys active
/// within the window; idle keys are dropped by a periodic retain pass.
///
/// Accuracy is approximate under concurrent slot turnover: a racing increment
/// can be lost at an epoch boundary. That slightly delays detection; it never
/// overcounts into a false alarm and never panics.
pub struct RollingCounter {
    slot_millis: u64,
    window_millis: u64,
    origin: Instant,
    entries: DashMap<String, SlotRing>,
    ops: AtomicU64,
}

impl RollingCounter {
    /// Create a counter with the given trailing window.
    ///
    /// A zero window is clamped to one millisecond per slot.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        let window_millis = window.as_millis() as u64;
        let slot_millis = (window_millis.div_ceil(SLOTS as u64)).max(1);

        Self {
            slot_millis,
            window_millis: slot_millis * SLOTS as u64,
            origin: Instant::now(),
            entries: DashMap::new(),
            ops: AtomicU64::new(0),
        }
    }

    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn current_epoch(&self, now: u64) -> u64 {
        now / self.slot_millis
    }

    /// Add one to the key's count in the current time slot.
    pub fn increment(&self, key: &str) {
        let now = self.now_millis();
        let epoch = self.current_epoch(now);

        // Fast path avoids allocating the owned key for already-tracked keys
        if let Some(ring) = self.entries.get(key) {
            Self::record(&ring, now, epoch);
        } else {
            let ring = self
                .entries
                .entry(key.to_string())
                .or_insert_with(|| SlotRing::new(now));
            Self::record(&ring, now, epoch);
        }

        self.maybe_shrink(now);
    }

    fn record(ring: &SlotRing, now: u64, epoch: u64) {
        ring.last_touch.store(now, Ordering::Relaxed);

        let slot = &ring.slots[(epoch % SLOTS as u64) as usize];
        let stored = slot.epoch.load(Ordering::Acquire);
        if stored != epoch {
            // The slot still holds a previous turn of the ring; whichever
            // thread wins the swap resets the count for the new epoch.
            if slot
                .epoch
                .compare_exchange(stored, epoch, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                slot.count.store(0, Ordering::Release);
            }
        }
        slot.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Reset the key's count to zero.
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Current in-window count for the key; `0` for unseen keys.
    #[must_use]
    pub fn value(&self, key: &str) -> u64 {
        let now = self.now_millis();
        let epoch = self.current_epoch(now);
        let min_epoch = epoch.saturating_sub(SLOTS as u64 - 1);

        match self.entries.get(key) {
            Some(ring) => ring
                .slots
                .iter()
                .filter(|slot| {
                    let slot_epoch = slot.epoch.load(Ordering::Acquire);
                    slot_epoch >= min_epoch && slot_epoch <= epoch
                })
                .map(|slot| slot.count.load(Ordering::Acquire))
                .sum(),
            None => 0,
        }
    }

    /// Number of keys currently held (including idle keys not yet evicted).
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// Periodically drop keys with no activity for a full window.
    fn maybe_shrink(&self, now: u64) {
        let ops = self.ops.fetch_add(1, Ordering::Relaxed);
        if ops % SHRINK_INTERVAL == 0 && ops > 0 {
            let cutoff = now.saturating_sub(self.window_millis);
            self.entries
                .retain(|_, ring| ring.last_touch.load(Ordering::Relaxed) >= cutoff);
        }
    }
}

impl LoginMetric for RollingCounter {
    fn value(&self, key: &str) -> u64 {
        RollingCounter::value(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_unseen_key_is_zero() {
        let counter = RollingCounter::new(Duration::from_secs(60));
        assert_eq!(counter.value("10.0.0.1"), 0);
    }

    #[test]
    fn test_increment_and_value() {
        let counter = RollingCounter::new(Duration::from_secs(60));

        counter.increment("10.0.0.1");
        counter.increment("10.0.0.1");
        counter.increment("10.0.0.2");

        assert_eq!(counter.value("10.0.0.1"), 2);
        assert_eq!(counter.value("10.0.0.2"), 1);
    }

    #[test]
    fn test_remove_resets_to_zero() {
        let counter = RollingCounter::new(Duration::from_secs(60));

        counter.increment("alice");
        counter.increment("alice");
        counter.remove("alice");

        assert_eq!(counter.value("alice"), 0);

        // Counting resumes cleanly after a reset
        counter.increment("alice");
        assert_eq!(counter.value("alice"), 1);
    }

    #[test]
    fn test_remove_unknown_key_is_harmless() {
        let counter = RollingCounter::new(Duration::from_secs(60));
        counter.remove("never-seen");
        assert_eq!(counter.value("never-seen"), 0);
    }

    #[test]
    fn test_counts_expire_after_window() {
        let counter = RollingCounter::new(Duration::from_millis(200));

        counter.increment("10.0.0.1");
        assert_eq!(counter.value("10.0.0.1"), 1);

        // Slot granularity rounds the effective window up; sleep past it
        thread::sleep(Duration::from_millis(400));
        assert_eq!(counter.value("10.0.0.1"), 0);
    }

    #[test]
    fn test_concurrent_increments_to_distinct_keys() {
        let counter = Arc::new(RollingCounter::new(Duration::from_secs(3600)));

        let mut handles = vec![];
        for t in 0..8 {
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                let key = format!("10.0.0.{}", t);
                for _ in 0..500 {
                    counter.increment(&key);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        for t in 0..8 {
            assert_eq!(counter.value(&format!("10.0.0.{}", t)), 500);
        }
    }

    #[test]
    fn test_concurrent_increments_to_same_key() {
        let counter = Arc::new(RollingCounter::new(Duration::from_secs(3600)));

        let mut handles = vec![];
        for _ in 0..8 {
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..500 {
                    counter.increment("shared");
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.value("shared"), 4000);
    }

    #[test]
    fn test_idle_keys_are_evicted() {
        let counter = RollingCounter::new(Duration::from_millis(100));

        counter.increment("stale");
        thread::sleep(Duration::from_millis(250));

        // Enough activity on another key to trip the shrink pass
        for _ in 0..(SHRINK_INTERVAL + 1) {
            counter.increment("active");
        }

        assert_eq!(counter.value("stale"), 0);
        assert_eq!(counter.tracked_keys(), 1);
    }
}
