//! Anomaly detection pipeline: rules, events, and threshold registries.

pub mod consumers;
mod events;
mod registry;
pub mod rules;

pub use consumers::{AuditLogger, RegistryPopulator};
#[cfg(feature = "metrics")]
pub use consumers::EventCounters;
pub use events::{AnomalyEvent, AnomalyEventVisitor, EventEmitter, EventPublisher};
pub use registry::{CredentialStuffingStatus, ThresholdRegistry};
pub use rules::{
    AnomalyRule, AnomalyRulesRunner, CredentialStuffingRule, IpOverThresholdRule,
    UserAgentOverThresholdRule, UsernameOverThresholdRule, GLOBAL_SCOPE,
};
