/// The main error type for breakwater operations.
#[derive(Debug, thiserror::Error)]
pub enum BreakwaterError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid bloom filter parameters: {0}")]
    InvalidBloomParameters(String),

    #[error("Anomaly rule failed: {0}")]
    RuleExecution(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BreakwaterError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a rule execution error.
    pub fn rule_execution(message: impl Into<String>) -> Self {
        Self::RuleExecution(message.into())
    }
}

/// Result type alias for breakwater operations.
pub type Result<T> = std::result::Result<T, BreakwaterError>;
