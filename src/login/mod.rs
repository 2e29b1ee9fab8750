//! Login attempt model and in-memory failure counting.

mod context;
mod counter;
mod metric;
mod strategy;

pub use context::{LoginContext, LoginContextBuilder, LoginFailureType, LoginResult};
pub use counter::RollingCounter;
pub use metric::LoginMetric;
pub use strategy::CountingStrategy;

#[cfg(test)]
pub(crate) use metric::test::FixedMetric;
