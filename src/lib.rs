//! Breakwater - real-time login abuse detection
//!
//! Breakwater detects brute-force and credential-stuffing login abuse as it
//! happens: every authentication attempt is counted into sliding-window
//! failure metrics, a configurable rule set turns those counts into anomaly
//! events, and Bloom-filter-backed registries answer "is this key currently
//! flagged?" in constant time on the request path.
//!
//! # Features
//!
//! - **Threshold rules**: per-IP, per-username, and per-user-agent failed
//!   login thresholds over a trailing window
//! - **Credential stuffing**: aggregate failure-ratio rule that catches
//!   distributed low-and-slow campaigns no single-key rule can see
//! - **Threshold registries**: lock-free Bloom-filter sets with no false
//!   negatives, queried by request filters without touching any counter
//! - **Event stream**: closed set of anomaly events fanned out to pluggable
//!   consumers (registry populator, audit log, optional prometheus counters)
//! - **Failure isolation**: one misbehaving rule never blinds the detector
//!
//! # Quick Start
//!
//! ```rust
//! use breakwater::{Config, Detector};
//! use breakwater::login::{LoginContext, LoginFailureType, LoginResult};
//!
//! // Initialize logging
//! // breakwater::init_tracing();
//!
//! // Create the detector once at startup
//! let detector = Detector::new(Config::default()).unwrap();
//!
//! // Feed it every completed authentication attempt
//! let context = LoginContext::builder()
//!     .ip("198.51.100.7")
//!     .username("alice")
//!     .result(LoginResult::failure(LoginFailureType::BadPassword))
//!     .build();
//! let events = detector.on_login(&context);
//!
//! // Request filters consult the registries on every request
//! if detector.ip_registry().contains("198.51.100.7") {
//!     // challenge or block
//! }
//! ```

pub mod bloom;
mod config;
pub mod detection;
mod detector;
mod error;
pub mod login;
pub mod useragent;
pub mod utils;

// Re-exports for public API
pub use config::{Config, ConfigBuilder, DimensionConfig, StuffingConfig};
pub use detection::{
    AnomalyEvent, AnomalyEventVisitor, AnomalyRule, CredentialStuffingStatus, ThresholdRegistry,
};
pub use detector::{Detector, DetectorBuilder};
pub use error::{BreakwaterError, Result};
pub use login::{CountingStrategy, LoginContext, LoginFailureType, LoginResult};
pub use useragent::UserAgentTokenizer;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main()
/// before creating the Detector.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "breakwater=debug")
/// - `BREAKWATER_LOG_JSON`: Set to "true" for JSON formatted logs
///
/// # Example
///
/// ```rust,no_run
/// fn main() {
///     breakwater::init_tracing();
///     // ... rest of your app
/// }
/// ```
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("BREAKWATER_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
