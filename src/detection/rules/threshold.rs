//! Per-dimension failed-login threshold rules.

use std::sync::Arc;

use crate::detection::events::{AnomalyEvent, EventEmitter};
use crate::detection::rules::AnomalyRule;
use crate::error::Result;
use crate::login::{LoginContext, LoginMetric};

// Threshold checks are strict: a count equal to the threshold does not fire.
fn is_over_threshold(value: u64, threshold: u64) -> bool {
    value > threshold
}

/// Fires when failed logins from the attempt's IP exceed the threshold.
pub struct IpOverThresholdRule {
    metric: Arc<dyn LoginMetric>,
    threshold: u64,
}

impl IpOverThresholdRule {
    /// Create a rule reading the given failed-login metric.
    #[must_use]
    pub fn new(metric: Arc<dyn LoginMetric>, threshold: u64) -> Self {
        Self { metric, threshold }
    }
}

impl AnomalyRule for IpOverThresholdRule {
    fn name(&self) -> &'static str {
        "ip_failed_login_over_threshold"
    }

    fn execute(&self, context: &LoginContext, emitter: &mut EventEmitter) -> Result<()> {
        let failed_logins = self.metric.value(context.ip());

        if is_over_threshold(failed_logins, self.threshold) {
            emitter.accept(AnomalyEvent::IpFailedLoginOverThreshold {
                ip: context.ip().to_string(),
            });
        }
        Ok(())
    }
}

/// Fires when failed logins for the attempt's username exceed the threshold.
pub struct UsernameOverThresholdRule {
    metric: Arc<dyn LoginMetric>,
    threshold: u64,
}

impl UsernameOverThresholdRule {
    /// Create a rule reading the given failed-login metric.
    #[must_use]
    pub fn new(metric: Arc<dyn LoginMetric>, threshold: u64) -> Self {
        Self { metric, threshold }
    }
}

impl AnomalyRule for UsernameOverThresholdRule {
    fn name(&self) -> &'static str {
        "username_failed_login_over_threshold"
    }

    fn execute(&self, context: &LoginContext, emitter: &mut EventEmitter) -> Result<()> {
        let failed_logins = self.metric.value(context.username());

        if is_over_threshold(failed_logins, self.threshold) {
            emitter.accept(AnomalyEvent::UsernameFailedLoginOverThreshold {
                username: context.username().to_string(),
            });
        }
        Ok(())
    }
}

/// Fires when failed logins from the attempt's user-agent token exceed the
/// threshold. Attempts with no token are skipped.
pub struct UserAgentOverThresholdRule {
    metric: Arc<dyn LoginMetric>,
    threshold: u64,
}

impl UserAgentOverThresholdRule {
    /// Create a rule reading the given failed-login metric.
    #[must_use]
    pub fn new(metric: Arc<dyn LoginMetric>, threshold: u64) -> Self {
        Self { metric, threshold }
    }
}

impl AnomalyRule for UserAgentOverThresholdRule {
    fn name(&self) -> &'static str {
        "user_agent_failed_login_over_threshold"
    }

    fn execute(&self, context: &LoginContext, emitter: &mut EventEmitter) -> Result<()> {
        let Some(token) = context.user_agent_token() else {
            return Ok(());
        };
        let failed_logins = self.metric.value(token);

        if is_over_threshold(failed_logins, self.threshold) {
            emitter.accept(AnomalyEvent::UserAgentFailedLoginOverThreshold {
                token: token.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::login::{FixedMetric, LoginFailureType, LoginResult};

    fn failed_context() -> LoginContext {
        LoginContext::builder()
            .ip("5.5.5.5")
            .username("alice")
            .user_agent_token("agent-token")
            .result(LoginResult::failure(LoginFailureType::BadPassword))
            .build()
    }

    #[test]
    fn test_does_not_fire_at_threshold() {
        let metric = Arc::new(FixedMetric::new(&[("5.5.5.5", 10)]));
        let rule = IpOverThresholdRule::new(metric, 10);

        let mut emitter = EventEmitter::new();
        rule.execute(&failed_context(), &mut emitter).unwrap();

        assert!(emitter.events().is_empty());
    }

    #[test]
    fn test_fires_above_threshold() {
        let metric = Arc::new(FixedMetric::new(&[("5.5.5.5", 11)]));
        let rule = IpOverThresholdRule::new(metric, 10);

        let mut emitter = EventEmitter::new();
        rule.execute(&failed_context(), &mut emitter).unwrap();

        assert_eq!(
            emitter.events(),
            &[AnomalyEvent::IpFailedLoginOverThreshold {
                ip: "5.5.5.5".to_string()
            }]
        );
    }

    #[test]
    fn test_username_rule_reads_username_key() {
        let metric = Arc::new(FixedMetric::new(&[("alice", 12)]));
        let rule = UsernameOverThresholdRule::new(metric, 10);

        let mut emitter = EventEmitter::new();
        rule.execute(&failed_context(), &mut emitter).unwrap();

        assert_eq!(
            emitter.events(),
            &[AnomalyEvent::UsernameFailedLoginOverThreshold {
                username: "alice".to_string()
            }]
        );
    }

    #[test]
    fn test_user_agent_rule_skips_missing_token() {
        let metric = Arc::new(FixedMetric::new(&[("agent-token", 100)]));
        let rule = UserAgentOverThresholdRule::new(metric, 10);

        let context = LoginContext::new(
            "5.5.5.5",
            "alice",
            LoginResult::failure(LoginFailureType::BadPassword),
        );

        let mut emitter = EventEmitter::new();
        rule.execute(&context, &mut emitter).unwrap();

        assert!(emitter.events().is_empty());
    }

    #[test]
    fn test_user_agent_rule_fires_on_token() {
        let metric = Arc::new(FixedMetric::new(&[("agent-token", 11)]));
        let rule = UserAgentOverThresholdRule::new(metric, 10);

        let mut emitter = EventEmitter::new();
        rule.execute(&failed_context(), &mut emitter).unwrap();

        assert_eq!(
            emitter.events(),
            &[AnomalyEvent::UserAgentFailedLoginOverThreshold {
                token: "agent-token".to_string()
            }]
        );
    }
}
