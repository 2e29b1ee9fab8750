//! Anomaly rules evaluated for every login attempt.

mod runner;
mod stuffing;
mod threshold;

pub use runner::AnomalyRulesRunner;
pub use stuffing::{CredentialStuffingRule, GLOBAL_SCOPE};
pub use threshold::{
    IpOverThresholdRule, UserAgentOverThresholdRule, UsernameOverThresholdRule,
};

use crate::detection::events::EventEmitter;
use crate::error::Result;
use crate::login::LoginContext;

/// A detection rule evaluated once per login attempt.
///
/// Rules are pure with respect to the context: they read it and the metrics
/// they were built with, and emit zero or one events into the emitter. A rule
/// returning an error is isolated by the runner; it must not assume its
/// failure stops the evaluation of other rules.
pub trait AnomalyRule: Send + Sync {
    /// Short stable name used in failure-isolation logs.
    fn name(&self) -> &'static str;

    /// Evaluate the rule for one attempt.
    fn execute(&self, context: &LoginContext, emitter: &mut EventEmitter) -> Result<()>;
}
