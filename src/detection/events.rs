//! Anomaly events and their visitor dispatch.

/// An anomaly raised by the detection rules for one login attempt.
///
/// The set of variants is closed on purpose: consumers dispatch through
/// [`AnomalyEvent::accept`], whose exhaustive match guarantees that adding a
/// variant forces every consumer to handle it at compile time, while adding a
/// consumer touches no event code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnomalyEvent {
    /// Failed logins from this IP exceeded the configured threshold.
    IpFailedLoginOverThreshold { ip: String },
    /// Failed logins for this username exceeded the configured threshold.
    UsernameFailedLoginOverThreshold { username: String },
    /// Failed logins from this user-agent token exceeded the configured threshold.
    UserAgentFailedLoginOverThreshold { token: String },
    /// The system-wide failure ratio indicates a distributed attack.
    GlobalCredentialStuffing,
}

impl AnomalyEvent {
    /// Stable snake_case name for logs and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IpFailedLoginOverThreshold { .. } => "ip_failed_login_over_threshold",
            Self::UsernameFailedLoginOverThreshold { .. } => "username_failed_login_over_threshold",
            Self::UserAgentFailedLoginOverThreshold { .. } => {
                "user_agent_failed_login_over_threshold"
            }
            Self::GlobalCredentialStuffing => "global_credential_stuffing",
        }
    }

    /// The flagged key, if the event concerns a single key.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::IpFailedLoginOverThreshold { ip } => Some(ip),
            Self::UsernameFailedLoginOverThreshold { username } => Some(username),
            Self::UserAgentFailedLoginOverThreshold { token } => Some(token),
            Self::GlobalCredentialStuffing => None,
        }
    }

    /// Present this event to a consumer, calling its per-variant handler.
    pub fn accept(&self, visitor: &dyn AnomalyEventVisitor) {
        match self {
            Self::IpFailedLoginOverThreshold { ip } => {
                visitor.on_ip_failed_login_over_threshold(ip);
            }
            Self::UsernameFailedLoginOverThreshold { username } => {
                visitor.on_username_failed_login_over_threshold(username);
            }
            Self::UserAgentFailedLoginOverThreshold { token } => {
                visitor.on_user_agent_failed_login_over_threshold(token);
            }
            Self::GlobalCredentialStuffing => {
                visitor.on_global_credential_stuffing();
            }
        }
    }
}

/// A consumer of anomaly events, one handler per variant.
///
/// Handlers receive the event's payload by reference and must not assume any
/// ordering across concurrent login evaluations. Side effects (populating a
/// registry, bumping a metric) are the visitor's own business.
pub trait AnomalyEventVisitor: Send + Sync {
    fn on_ip_failed_login_over_threshold(&self, ip: &str);
    fn on_username_failed_login_over_threshold(&self, username: &str);
    fn on_user_agent_failed_login_over_threshold(&self, token: &str);
    fn on_global_credential_stuffing(&self);
}

/// Accumulates the events emitted by the rules for one login attempt.
///
/// Emission order is preserved: events publish in the order rules emitted
/// them.
#[derive(Debug, Default)]
pub struct EventEmitter {
    events: Vec<AnomalyEvent>,
}

impl EventEmitter {
    /// Create an empty emitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an emitted event.
    pub fn accept(&mut self, event: AnomalyEvent) {
        self.events.push(event);
    }

    /// Events accumulated so far, in emission order.
    #[must_use]
    pub fn events(&self) -> &[AnomalyEvent] {
        &self.events
    }

    /// Consume the emitter, yielding the accumulated events.
    #[must_use]
    pub fn into_events(self) -> Vec<AnomalyEvent> {
        self.events
    }
}

/// Fans accumulated events out to the registered consumers.
pub struct EventPublisher {
    visitors: Vec<Box<dyn AnomalyEventVisitor>>,
}

impl EventPublisher {
    /// Create a publisher delivering to the given consumers.
    #[must_use]
    pub fn new(visitors: Vec<Box<dyn AnomalyEventVisitor>>) -> Self {
        Self { visitors }
    }

    /// Deliver each event to every consumer, in emission order.
    pub fn publish(&self, events: &[AnomalyEvent]) {
        for event in events {
            tracing::debug!(
                target: "breakwater.detection.event",
                kind = event.kind(),
                key = event.key().unwrap_or("-"),
                "Publishing anomaly event"
            );
            for visitor in &self.visitors {
                event.accept(visitor.as_ref());
            }
        }
    }
}
