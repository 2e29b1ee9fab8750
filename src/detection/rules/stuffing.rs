//! Aggregate credential-stuffing detection.

use std::sync::Arc;

use crate::detection::events::{AnomalyEvent, EventEmitter};
use crate::detection::rules::AnomalyRule;
use crate::error::Result;
use crate::login::{LoginContext, LoginMetric};

/// Key under which the system-wide attempt and failure counters accumulate.
pub const GLOBAL_SCOPE: &str = "global";

/// Fires when the system-wide failure ratio indicates a distributed attack.
///
/// Per-key threshold rules are blind to low-and-slow campaigns where every
/// single IP, username, and user agent stays under its threshold. This rule
/// watches two global rolling counters instead (all attempts and failed
/// attempts) and emits [`AnomalyEvent::GlobalCredentialStuffing`] when the
/// in-window failure ratio strictly exceeds the configured ratio, provided
/// enough attempts were seen to make the ratio meaningful.
pub struct CredentialStuffingRule {
    attempts: Arc<dyn LoginMetric>,
    failures: Arc<dyn LoginMetric>,
    failure_ratio: f64,
    min_samples: u64,
}

impl CredentialStuffingRule {
    /// Create a rule over the global attempt and failure metrics.
    #[must_use]
    pub fn new(
        attempts: Arc<dyn LoginMetric>,
        failures: Arc<dyn LoginMetric>,
        failure_ratio: f64,
        min_samples: u64,
    ) -> Self {
        Self {
            attempts,
            failures,
            failure_ratio,
            min_samples,
        }
    }
}

impl AnomalyRule for CredentialStuffingRule {
    fn name(&self) -> &'static str {
        "global_credential_stuffing"
    }

    fn execute(&self, _context: &LoginContext, emitter: &mut EventEmitter) -> Result<()> {
        let attempts = self.attempts.value(GLOBAL_SCOPE);
        if attempts < self.min_samples {
            return Ok(());
        }

        let failures = self.failures.value(GLOBAL_SCOPE);
        let ratio = failures as f64 / attempts as f64;

        if ratio > self.failure_ratio {
            tracing::debug!(
                target: "breakwater.detection.stuffing",
                attempts,
                failures,
                ratio,
                threshold = self.failure_ratio,
                "Failure ratio over threshold"
            );
            emitter.accept(AnomalyEvent::GlobalCredentialStuffing);
        }
        Ok(())
    }
}
