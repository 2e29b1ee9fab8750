//! Immutable snapshot of one authentication attempt.

use std::time::SystemTime;

/// Why an authentication attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginFailureType {
    BadPassword,
    UnknownUser,
    InvalidToken,
    ExpiredToken,
    Locked,
    Disabled,
    Other,
}

/// Result of an authentication attempt.
///
/// A failure always carries its reason; a success never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Success,
    Failure(LoginFailureType),
}

impl LoginResult {
    /// A successful attempt.
    #[must_use]
    pub fn success() -> Self {
        Self::Success
    }

    /// A failed attempt with the given reason.
    #[must_use]
    pub fn failure(reason: LoginFailureType) -> Self {
        Self::Failure(reason)
    }

    /// Whether the attempt succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The failure reason, present iff the attempt failed.
    #[must_use]
    pub fn failure_type(&self) -> Option<LoginFailureType> {
        match self {
            Self::Success => None,
            Self::Failure(reason) => Some(*reason),
        }
    }
}

/// Immutable view of one completed authentication attempt.
///
/// Built once per attempt by the host's authentication listener, read by the
/// anomaly rules during evaluation, and dropped afterwards. The detection
/// core never retains it.
///
/// # Example
///
/// ```rust
/// use breakwater::login::{LoginContext, LoginFailureType, LoginResult};
///
/// let context = LoginContext::builder()
///     .ip("198.51.100.7")
///     .username("alice")
///     .user_agent_token("b1946ac92492d2347c6235b4d2611184f0b0f1a7")
///     .result(LoginResult::failure(LoginFailureType::BadPassword))
///     .build();
///
/// assert!(!context.result().is_success());
/// ```
#[derive(Debug, Clone)]
pub struct LoginContext {
    ip: String,
    username: String,
    user_agent_token: Option<String>,
    result: LoginResult,
    timestamp: SystemTime,
}

impl LoginContext {
    /// Create a context with the current timestamp.
    #[must_use]
    pub fn new(ip: impl Into<String>, username: impl Into<String>, result: LoginResult) -> Self {
        Self {
            ip: ip.into(),
            username: username.into(),
            user_agent_token: None,
            result,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a builder for contexts with optional fields.
    #[must_use]
    pub fn builder() -> LoginContextBuilder {
        LoginContextBuilder::new()
    }

    /// Source IP of the attempt.
    #[must_use]
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Username presented in the attempt.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Pre-tokenized user agent, if the host captured one.
    #[must_use]
    pub fn user_agent_token(&self) -> Option<&str> {
        self.user_agent_token.as_deref()
    }

    /// Outcome of the attempt.
    #[must_use]
    pub fn result(&self) -> &LoginResult {
        &self.result
    }

    /// When the attempt completed.
    #[must_use]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

/// Builder for [`LoginContext`].
#[must_use = "builder does nothing until you call build()"]
pub struct LoginContextBuilder {
    ip: String,
    username: String,
    user_agent_token: Option<String>,
    result: LoginResult,
    timestamp: SystemTime,
}

impl LoginContextBuilder {
    fn new() -> Self {
        Self {
            ip: String::new(),
            username: String::new(),
            user_agent_token: None,
            result: LoginResult::success(),
            timestamp: SystemTime::now(),
        }
    }

    /// Set the source IP.
    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self
    }

    /// Set the presented username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the pre-tokenized user agent.
    pub fn user_agent_token(mut self, token: impl Into<String>) -> Self {
        self.user_agent_token = Some(token.into());
        self
    }

    /// Set the attempt outcome.
    pub fn result(mut self, result: LoginResult) -> Self {
        self.result = result;
        self
    }

    /// Override the attempt timestamp (defaults to now).
    pub fn timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Build the context.
    pub fn build(self) -> LoginContext {
        LoginContext {
            ip: self.ip,
            username: self.username,
            user_agent_token: self.user_agent_token,
            result: self.result,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_success() {
        let result = LoginResult::success();
        assert!(result.is_success());
        assert_eq!(result.failure_type(), None);
    }

    #[test]
    fn test_result_failure_carries_reason() {
        let result = LoginResult::failure(LoginFailureType::UnknownUser);
        assert!(!result.is_success());
        assert_eq!(result.failure_type(), Some(LoginFailureType::UnknownUser));
    }

    #[test]
    fn test_context_builder() {
        let context = LoginContext::builder()
            .ip("203.0.113.5")
            .username("bob")
            .user_agent_token("abc123")
            .result(LoginResult::failure(LoginFailureType::BadPassword))
            .build();

        assert_eq!(context.ip(), "203.0.113.5");
        assert_eq!(context.username(), "bob");
        assert_eq!(context.user_agent_token(), Some("abc123"));
        assert!(!context.result().is_success());
    }

    #[test]
    fn test_context_without_user_agent() {
        let context = LoginContext::new("203.0.113.5", "bob", LoginResult::success());
        assert_eq!(context.user_agent_token(), None);
    }
}
