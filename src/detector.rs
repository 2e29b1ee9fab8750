//! Composition root wiring counters, rules, registries, and consumers.

use std::sync::Arc;

use crate::config::Config;
use crate::detection::{
    AnomalyEvent, AnomalyEventVisitor, AnomalyRule, AnomalyRulesRunner, AuditLogger,
    CredentialStuffingRule, CredentialStuffingStatus, EventPublisher, IpOverThresholdRule,
    RegistryPopulator, ThresholdRegistry, UserAgentOverThresholdRule, UsernameOverThresholdRule,
    GLOBAL_SCOPE,
};
use crate::error::Result;
use crate::login::{CountingStrategy, LoginContext, LoginMetric, RollingCounter};

/// The login-anomaly detection engine.
///
/// Owns all process-wide detection state: one rolling counter and one
/// threshold registry per dimension, the global stuffing counters, the rule
/// set, and the event consumers. Construct it once at startup, share it via
/// `Arc`, and call [`on_login`] from wherever authentication attempts
/// complete. Every operation is synchronous and safe under any number of
/// concurrent callers.
///
/// [`on_login`]: Detector::on_login
///
/// # Example
///
/// ```rust
/// use breakwater::{Config, Detector};
/// use breakwater::login::{LoginContext, LoginFailureType, LoginResult};
///
/// let detector = Detector::new(Config::default()).unwrap();
///
/// let context = LoginContext::new(
///     "198.51.100.7",
///     "alice",
///     LoginResult::failure(LoginFailureType::BadPassword),
/// );
/// let events = detector.on_login(&context);
/// assert!(events.is_empty());
///
/// // Request filters check flagged keys without touching the counters
/// assert!(!detector.ip_registry().contains("198.51.100.7"));
/// ```
pub struct Detector {
    ip_metric: Arc<RollingCounter>,
    username_metric: Arc<RollingCounter>,
    user_agent_metric: Arc<RollingCounter>,
    attempts: Arc<RollingCounter>,
    failures: Arc<RollingCounter>,
    ip_strategy: CountingStrategy,
    username_strategy: CountingStrategy,
    user_agent_strategy: CountingStrategy,
    runner: AnomalyRulesRunner,
    ip_registry: Arc<ThresholdRegistry>,
    username_registry: Arc<ThresholdRegistry>,
    user_agent_registry: Arc<ThresholdRegistry>,
    stuffing_status: Arc<CredentialStuffingStatus>,
}

impl Detector {
    /// Build a detector from the given configuration.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or a registry's Bloom filter
    /// cannot be sized; the detector must not start half-configured.
    pub fn new(config: Config) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Build a detector with the default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(Config::default())
    }

    /// Create a builder for detectors with custom rules or consumers.
    #[must_use]
    pub fn builder() -> DetectorBuilder {
        DetectorBuilder::new()
    }

    /// Process one completed authentication attempt.
    ///
    /// Counts the attempt into the per-dimension and global metrics first,
    /// then evaluates every rule, so the attempt itself is visible to the
    /// rules. Emitted events are delivered to the consumers and returned in
    /// emission order.
    pub fn on_login(&self, context: &LoginContext) -> Vec<AnomalyEvent> {
        let result = context.result();

        self.ip_strategy
            .count(&self.ip_metric, result, context.ip());
        self.username_strategy
            .count(&self.username_metric, result, context.username());
        if let Some(token) = context.user_agent_token() {
            self.user_agent_strategy
                .count(&self.user_agent_metric, result, token);
        }

        self.attempts.increment(GLOBAL_SCOPE);
        if !result.is_success() {
            self.failures.increment(GLOBAL_SCOPE);
        }

        self.runner.on_login(context)
    }

    /// Registry of IPs currently flagged as over threshold.
    #[must_use]
    pub fn ip_registry(&self) -> Arc<ThresholdRegistry> {
        self.ip_registry.clone()
    }

    /// Registry of usernames currently flagged as over threshold.
    #[must_use]
    pub fn username_registry(&self) -> Arc<ThresholdRegistry> {
        self.username_registry.clone()
    }

    /// Registry of user-agent tokens currently flagged as over threshold.
    #[must_use]
    pub fn user_agent_registry(&self) -> Arc<ThresholdRegistry> {
        self.user_agent_registry.clone()
    }

    /// Whether the aggregate rule has flagged an ongoing stuffing campaign.
    #[must_use]
    pub fn is_credential_stuffing_active(&self) -> bool {
        self.stuffing_status.is_active()
    }

    /// Shared handle to the credential-stuffing status.
    #[must_use]
    pub fn credential_stuffing_status(&self) -> Arc<CredentialStuffingStatus> {
        self.stuffing_status.clone()
    }
}

/// Builder for [`Detector`].
#[must_use = "builder does nothing until you call build()"]
pub struct DetectorBuilder {
    config: Config,
    extra_rules: Vec<Box<dyn AnomalyRule>>,
    extra_visitors: Vec<Box<dyn AnomalyEventVisitor>>,
    audit_log: bool,
}

impl DetectorBuilder {
    fn new() -> Self {
        Self {
            config: Config::default(),
            extra_rules: Vec::new(),
            extra_visitors: Vec::new(),
            audit_log: true,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Add a custom rule, evaluated after the built-in ones.
    pub fn rule(mut self, rule: Box<dyn AnomalyRule>) -> Self {
        self.extra_rules.push(rule);
        self
    }

    /// Add a custom event consumer.
    pub fn visitor(mut self, visitor: Box<dyn AnomalyEventVisitor>) -> Self {
        self.extra_visitors.push(visitor);
        self
    }

    /// Disable the built-in audit-log consumer.
    pub fn without_audit_log(mut self) -> Self {
        self.audit_log = false;
        self
    }

    /// Build the detector.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or a registry cannot be
    /// constructed.
    pub fn build(self) -> Result<Detector> {
        let config = self.config;
        config.validate()?;

        let window = config.window();

        let ip_metric = Arc::new(RollingCounter::new(window));
        let username_metric = Arc::new(RollingCounter::new(window));
        let user_agent_metric = Arc::new(RollingCounter::new(window));
        let attempts = Arc::new(RollingCounter::new(window));
        let failures = Arc::new(RollingCounter::new(window));

        let ip_registry = Arc::new(ThresholdRegistry::new(
            "ip",
            config.ip.expected_insertions,
            config.ip.false_positive_probability,
        )?);
        let username_registry = Arc::new(ThresholdRegistry::new(
            "username",
            config.username.expected_insertions,
            config.username.false_positive_probability,
        )?);
        let user_agent_registry = Arc::new(ThresholdRegistry::new(
            "user_agent",
            config.user_agent.expected_insertions,
            config.user_agent.false_positive_probability,
        )?);
        let stuffing_status = Arc::new(CredentialStuffingStatus::new());

        let mut rules: Vec<Box<dyn AnomalyRule>> = vec![
            Box::new(IpOverThresholdRule::new(
                ip_metric.clone() as Arc<dyn LoginMetric>,
                config.ip.threshold,
            )),
            Box::new(UsernameOverThresholdRule::new(
                username_metric.clone() as Arc<dyn LoginMetric>,
                config.username.threshold,
            )),
            Box::new(UserAgentOverThresholdRule::new(
                user_agent_metric.clone() as Arc<dyn LoginMetric>,
                config.user_agent.threshold,
            )),
            Box::new(CredentialStuffingRule::new(
                attempts.clone() as Arc<dyn LoginMetric>,
                failures.clone() as Arc<dyn LoginMetric>,
                config.stuffing.failure_ratio,
                config.stuffing.min_samples,
            )),
        ];
        rules.extend(self.extra_rules);

        let mut visitors: Vec<Box<dyn AnomalyEventVisitor>> =
            vec![Box::new(RegistryPopulator::new(
                ip_registry.clone(),
                username_registry.clone(),
                user_agent_registry.clone(),
                stuffing_status.clone(),
            ))];
        if self.audit_log {
            visitors.push(Box::new(AuditLogger::new()));
        }
        visitors.extend(self.extra_visitors);

        let runner = AnomalyRulesRunner::new(rules, EventPublisher::new(visitors));

        tracing::info!(
            target: "breakwater.detector.started",
            window_seconds = config.window_seconds,
            rules = runner.rule_count(),
            "Login anomaly detector ready"
        );

        Ok(Detector {
            ip_metric,
            username_metric,
            user_agent_metric,
            attempts,
            failures,
            ip_strategy: config.ip.strategy,
            username_strategy: config.username.strategy,
            user_agent_strategy: config.user_agent.strategy,
            runner,
            ip_registry,
            username_registry,
            user_agent_registry,
            stuffing_status,
        })
    }
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
