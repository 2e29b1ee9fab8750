//! Built-in consumers of the anomaly event stream.

use std::sync::Arc;

use crate::detection::events::AnomalyEventVisitor;
use crate::detection::registry::{CredentialStuffingStatus, ThresholdRegistry};

/// Consumer that turns threshold events into registry entries.
///
/// This is the write side of the detection/decision split: each keyed event
/// puts its key into the matching registry, and the global event raises the
/// credential-stuffing status.
pub struct RegistryPopulator {
    ip: Arc<ThresholdRegistry>,
    username: Arc<ThresholdRegistry>,
    user_agent: Arc<ThresholdRegistry>,
    stuffing: Arc<CredentialStuffingStatus>,
}

impl RegistryPopulator {
    /// Create a populator writing to the given registries.
    #[must_use]
    pub fn new(
        ip: Arc<ThresholdRegistry>,
        username: Arc<ThresholdRegistry>,
        user_agent: Arc<ThresholdRegistry>,
        stuffing: Arc<CredentialStuffingStatus>,
    ) -> Self {
        Self {
            ip,
            username,
            user_agent,
            stuffing,
        }
    }
}

impl AnomalyEventVisitor for RegistryPopulator {
    fn on_ip_failed_login_over_threshold(&self, ip: &str) {
        self.ip.put(ip);
    }

    fn on_username_failed_login_over_threshold(&self, username: &str) {
        self.username.put(username);
    }

    fn on_user_agent_failed_login_over_threshold(&self, token: &str) {
        self.user_agent.put(token);
    }

    fn on_global_credential_stuffing(&self) {
        self.stuffing.activate();
    }
}

/// Consumer that writes each anomaly to the audit log.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditLogger;

impl AuditLogger {
    /// Create an audit logger.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AnomalyEventVisitor for AuditLogger {
    fn on_ip_failed_login_over_threshold(&self, ip: &str) {
        tracing::warn!(
            target: "breakwater.audit.anomaly",
            kind = "ip_failed_login_over_threshold",
            ip = %ip,
            "IP exceeded failed login threshold"
        );
    }

    fn on_username_failed_login_over_threshold(&self, username: &str) {
        tracing::warn!(
            target: "breakwater.audit.anomaly",
            kind = "username_failed_login_over_threshold",
            username = %username,
            "Username exceeded failed login threshold"
        );
    }

    fn on_user_agent_failed_login_over_threshold(&self, token: &str) {
        tracing::warn!(
            target: "breakwater.audit.anomaly",
            kind = "user_agent_failed_login_over_threshold",
            user_agent_token = %token,
            "User agent exceeded failed login threshold"
        );
    }

    fn on_global_credential_stuffing(&self) {
        tracing::warn!(
            target: "breakwater.audit.anomaly",
            kind = "global_credential_stuffing",
            "Global credential stuffing detected"
        );
    }
}

/// Consumer that counts anomalies by kind in a prometheus counter.
#[cfg(feature = "metrics")]
pub struct EventCounters {
    anomalies_total: prometheus::IntCounterVec,
    registry: prometheus::Registry,
}

#[cfg(feature = "metrics")]
impl EventCounters {
    /// Create the counters and register them in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = prometheus::Registry::new();

        let anomalies_total = prometheus::IntCounterVec::new(
            prometheus::Opts::new("anomalies_total", "Total anomaly events by kind")
                .namespace("breakwater"),
            &["kind"],
        )?;
        registry.register(Box::new(anomalies_total.clone()))?;

        Ok(Self {
            anomalies_total,
            registry,
        })
    }

    /// The prometheus registry holding the counters, for the host's exporter.
    pub fn registry(&self) -> &prometheus::Registry {
        &self.registry
    }

    fn record(&self, kind: &str) {
        self.anomalies_total.with_label_values(&[kind]).inc();
    }
}

#[cfg(feature = "metrics")]
impl AnomalyEventVisitor for EventCounters {
    fn on_ip_failed_login_over_threshold(&self, _ip: &str) {
        self.record("ip_failed_login_over_threshold");
    }

    fn on_username_failed_login_over_threshold(&self, _username: &str) {
        self.record("username_failed_login_over_threshold");
    }

    fn on_user_agent_failed_login_over_threshold(&self, _token: &str) {
        self.record("user_agent_failed_login_over_threshold");
    }

    fn on_global_credential_stuffing(&self) {
        self.record("global_credential_stuffing");
    }
}
