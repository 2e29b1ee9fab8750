//! Integration tests for the full detection flow.
//!
//! These tests drive a detector the way a host application would: feed it
//! completed authentication attempts, then check the anomaly events and the
//! registries a request-filter layer would consult.

use std::sync::{Arc, Mutex};

use breakwater::detection::EventEmitter;
use breakwater::login::{LoginContext, LoginFailureType, LoginResult};
use breakwater::{
    AnomalyEvent, AnomalyEventVisitor, AnomalyRule, Config, Detector, Result, StuffingConfig,
    UserAgentTokenizer,
};

fn failed_login(ip: &str, username: &str, user_agent: &str) -> LoginContext {
    let tokenizer = UserAgentTokenizer::sha1();
    LoginContext::builder()
        .ip(ip)
        .username(username)
        .user_agent_token(tokenizer.tokenize(user_agent))
        .result(LoginResult::failure(LoginFailureType::BadPassword))
        .build()
}

fn successful_login(ip: &str, username: &str) -> LoginContext {
    LoginContext::builder()
        .ip(ip)
        .username(username)
        .result(LoginResult::success())
        .build()
}

/// Configuration with per-dimension thresholds low enough to exercise and a
/// stuffing rule that stays quiet unless a test wants it.
fn test_config() -> Config {
    Config::builder()
        .window_seconds(60)
        .ip_threshold(3)
        .username_threshold(3)
        .user_agent_threshold(3)
        .stuffing(StuffingConfig {
            failure_ratio: 0.9,
            min_samples: 1_000,
        })
        .build()
}

#[test]
fn test_brute_force_from_one_ip_is_flagged() {
    let detector = Detector::new(test_config()).unwrap();

    // Spray across many usernames from one IP, staying under the per-username
    // threshold
    for i in 0..3 {
        let events = detector.on_login(&failed_login(
            "203.0.113.99",
            &format!("victim-{}", i),
            &format!("agent-{}", i),
        ));
        assert!(events.is_empty(), "no event before the threshold is crossed");
    }

    let events = detector.on_login(&failed_login("203.0.113.99", "victim-3", "agent-3"));
    assert_eq!(
        events,
        vec![AnomalyEvent::IpFailedLoginOverThreshold {
            ip: "203.0.113.99".to_string()
        }]
    );

    // The request-filter side sees the flag without touching any counter
    let registry = detector.ip_registry();
    assert!(registry.contains("203.0.113.99"));
    assert!(!registry.contains("198.51.100.1"));
}

#[test]
fn test_username_attack_across_ips_is_flagged() {
    let detector = Detector::new(test_config()).unwrap();

    for i in 0..4 {
        detector.on_login(&failed_login(
            &format!("10.0.0.{}", i),
            "admin",
            &format!("agent-{}", i),
        ));
    }

    assert!(detector.username_registry().contains("admin"));
    // The individual IPs never crossed their own threshold
    assert!(!detector.ip_registry().contains("10.0.0.1"));
}

#[test]
fn test_user_agent_attack_is_flagged_by_token() {
    let detector = Detector::new(test_config()).unwrap();
    let tokenizer = UserAgentTokenizer::sha1();
    let scripted_agent = "python-requests/2.31.0";

    for i in 0..4 {
        detector.on_login(&failed_login(
            &format!("10.0.1.{}", i),
            &format!("victim-{}", i),
            scripted_agent,
        ));
    }

    // A filter tokenizes the incoming header the same way before the lookup
    let token = tokenizer.tokenize(scripted_agent);
    assert!(detector.user_agent_registry().contains(&token));
    assert!(!detector
        .user_agent_registry()
        .contains(&tokenizer.tokenize("Mozilla/5.0")));
}

#[test]
fn test_successful_login_resets_consecutive_username_streak() {
    let detector = Detector::new(test_config()).unwrap();

    detector.on_login(&failed_login("10.0.2.1", "alice", "agent-a"));
    detector.on_login(&failed_login("10.0.2.2", "alice", "agent-b"));
    detector.on_login(&successful_login("10.0.2.3", "alice"));
    detector.on_login(&failed_login("10.0.2.4", "alice", "agent-c"));
    let events = detector.on_login(&failed_login("10.0.2.5", "alice", "agent-d"));

    // Streak after the success is 2, never over the threshold of 3
    assert!(events.is_empty());
    assert!(!detector.username_registry().contains("alice"));
}

#[test]
fn test_distributed_stuffing_trips_only_the_aggregate_rule() {
    let config = Config::builder()
        .window_seconds(60)
        .ip_threshold(50)
        .username_threshold(50)
        .user_agent_threshold(50)
        .stuffing(StuffingConfig {
            failure_ratio: 0.5,
            min_samples: 20,
        })
        .build();
    let detector = Detector::new(config).unwrap();

    // Every key is distinct: classic low-and-slow credential stuffing
    let mut stuffing_events = 0;
    for i in 0..40 {
        let events = detector.on_login(&failed_login(
            &format!("172.16.{}.{}", i / 256, i % 256),
            &format!("leaked-user-{}", i),
            &format!("agent-{}", i),
        ));
        stuffing_events += events
            .iter()
            .filter(|event| **event == AnomalyEvent::GlobalCredentialStuffing)
            .count();
    }

    assert!(stuffing_events > 0);
    assert!(detector.is_credential_stuffing_active());

    // No single key ever crossed a per-dimension threshold
    assert!(!detector.ip_registry().contains("172.16.0.0"));
    assert!(!detector.username_registry().contains("leaked-user-0"));
}

#[test]
fn test_failing_custom_rule_does_not_blind_the_detector() {
    struct BrokenRule;

    impl AnomalyRule for BrokenRule {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn execute(&self, _context: &LoginContext, _emitter: &mut EventEmitter) -> Result<()> {
            Err(anyhow::anyhow!("backend unavailable").into())
        }
    }

    let detector = Detector::builder()
        .config(test_config())
        .rule(Box::new(BrokenRule))
        .build()
        .unwrap();

    for i in 0..4 {
        detector.on_login(&failed_login("203.0.113.7", &format!("u-{}", i), "agent"));
    }

    // The broken rule failed on every attempt, the IP rule still fired
    assert!(detector.ip_registry().contains("203.0.113.7"));
}

#[test]
fn test_custom_visitor_sees_the_event_stream() {
    #[derive(Default)]
    struct Collector {
        kinds: Mutex<Vec<&'static str>>,
    }

    struct CollectorVisitor(Arc<Collector>);

    impl AnomalyEventVisitor for CollectorVisitor {
        fn on_ip_failed_login_over_threshold(&self, _ip: &str) {
            self.0.kinds.lock().unwrap().push("ip");
        }
        fn on_username_failed_login_over_threshold(&self, _username: &str) {
            self.0.kinds.lock().unwrap().push("username");
        }
        fn on_user_agent_failed_login_over_threshold(&self, _token: &str) {
            self.0.kinds.lock().unwrap().push("user_agent");
        }
        fn on_global_credential_stuffing(&self) {
            self.0.kinds.lock().unwrap().push("global");
        }
    }

    let collector = Arc::new(Collector::default());
    let detector = Detector::builder()
        .config(test_config())
        .visitor(Box::new(CollectorVisitor(collector.clone())))
        .build()
        .unwrap();

    // Same IP, username, and agent: all three dimensions cross together
    for _ in 0..4 {
        detector.on_login(&failed_login("203.0.113.50", "carol", "same-agent"));
    }

    let kinds = collector.kinds.lock().unwrap();
    assert!(kinds.contains(&"ip"));
    assert!(kinds.contains(&"username"));
    assert!(kinds.contains(&"user_agent"));
    assert!(!kinds.contains(&"global"));
}

#[test]
fn test_concurrent_logins_and_filter_lookups() {
    use std::thread;

    let config = Config::builder()
        .window_seconds(3600)
        .ip_threshold(10)
        .username_threshold(1_000)
        .user_agent_threshold(1_000)
        .build();
    let detector = Arc::new(Detector::new(config).unwrap());

    let mut handles = vec![];

    // Writers: concurrent login streams from distinct IPs
    for t in 0..4 {
        let detector = detector.clone();
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                detector.on_login(&failed_login(
                    &format!("10.9.{}.1", t),
                    &format!("user-{}-{}", t, i),
                    "shared-agent",
                ));
            }
        }));
    }

    // Readers: request filters polling the registry while logins flow
    for _ in 0..2 {
        let detector = detector.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                let _ = detector.ip_registry().contains("10.9.0.1");
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // 50 failures per IP is far over the threshold of 10
    for t in 0..4 {
        assert!(detector.ip_registry().contains(&format!("10.9.{}.1", t)));
    }
}
