//! Executes the configured rule set for one login attempt.

use crate::detection::events::{AnomalyEvent, EventEmitter, EventPublisher};
use crate::detection::rules::AnomalyRule;
use crate::login::LoginContext;

/// Runs every configured rule against a login attempt and publishes the
/// resulting events.
///
/// Rules are independent reads; their execution order carries no meaning,
/// but events publish in the order they were emitted. A rule that fails is
/// logged and skipped; one misbehaving rule must not blind the whole
/// detector for that attempt.
pub struct AnomalyRulesRunner {
    rules: Vec<Box<dyn AnomalyRule>>,
    publisher: EventPublisher,
}

impl AnomalyRulesRunner {
    /// Create a runner over the given rules, publishing to `publisher`.
    #[must_use]
    pub fn new(rules: Vec<Box<dyn AnomalyRule>>, publisher: EventPublisher) -> Self {
        Self { rules, publisher }
    }

    /// Evaluate all rules for one attempt and publish the emitted events.
    ///
    /// Returns the events in emission order, after they were delivered to
    /// the consumers.
    pub fn on_login(&self, context: &LoginContext) -> Vec<AnomalyEvent> {
        let mut emitter = EventEmitter::new();

        for rule in &self.rules {
            if let Err(error) = rule.execute(context, &mut emitter) {
                tracing::warn!(
                    target: "breakwater.detection.rule_failed",
                    rule = rule.name(),
                    error = %error,
                    "Anomaly rule failed; remaining rules still run"
                );
            }
        }

        let events = emitter.into_events();
        self.publisher.publish(&events);
        events
    }

    /// Number of configured rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
