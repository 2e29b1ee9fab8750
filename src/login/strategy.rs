//! Policies mapping a login outcome to a counter mutation.

use crate::login::context::LoginResult;
use crate::login::counter::RollingCounter;

/// How a login outcome mutates a rolling counter.
///
/// Strategies are pure policy: they only ever call `increment` or `remove`
/// and never read the counter. The same [`RollingCounter`] therefore serves
/// streak or cumulative semantics purely by the strategy configured for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingStrategy {
    /// Success resets the key to zero; failure increments. The count is the
    /// current run of failures with no intervening success.
    ConsecutiveFails,
    /// Success is a no-op; failure increments. The count is all failures in
    /// the window regardless of successes in between.
    TotalFails,
}

impl CountingStrategy {
    /// Apply the outcome to the counter for `key`.
    pub fn count(&self, counter: &RollingCounter, result: &LoginResult, key: &str) {
        match self {
            Self::ConsecutiveFails => {
                if result.is_success() {
                    counter.remove(key);
                } else {
                    counter.increment(key);
                }
            }
            Self::TotalFails => {
                if !result.is_success() {
                    counter.increment(key);
                }
            }
        }
    }
}
