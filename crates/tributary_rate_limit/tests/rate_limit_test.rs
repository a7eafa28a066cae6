use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tributary_error::RateLimitErrorKind;
use tributary_rate_limit::{
    InMemoryRateLimitStore, ManualClock, RateLimitConfig, RateLimitPolicy, RateLimitStore,
    RateLimiter, WindowConfig, WindowKind,
};

fn limiter(
    windows: Vec<WindowConfig>,
    start_ms: u64,
) -> (RateLimiter, Arc<InMemoryRateLimitStore>, Arc<ManualClock>) {
    let store = Arc::new(InMemoryRateLimitStore::new());
    let clock = Arc::new(ManualClock::new(start_ms));
    let policy = RateLimitPolicy::new(windows).expect("valid policy");
    let limiter = RateLimiter::new(policy, store.clone()).with_clock(clock.clone());
    (limiter, store, clock)
}

#[test]
fn allows_exactly_max_requests_then_rejects() {
    let (limiter, store, _clock) = limiter(vec![WindowConfig::new(WindowKind::Minute, 3)], 1_000);

    for expected_remaining in [2, 1, 0] {
        let decision = limiter.check_and_consume("alice");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, expected_remaining);
        assert_eq!(decision.reset_at_ms, 61_000);
    }

    let rejected = limiter.check_and_consume("alice");
    assert!(!rejected.allowed);
    assert_eq!(rejected.remaining, 0);
    assert_eq!(rejected.reset_at_ms, 61_000);
    assert_eq!(rejected.limited_by, Some(WindowKind::Minute));

    let window = store.window("alice", WindowKind::Minute).expect("window tracked");
    assert_eq!(*window.count(), 3);
}

#[test]
fn window_resets_once_reset_time_is_reached() {
    let (limiter, store, clock) = limiter(vec![WindowConfig::new(WindowKind::Minute, 2)], 0);

    assert!(limiter.check_and_consume("alice").allowed);
    assert!(limiter.check_and_consume("alice").allowed);
    clock.set(59_999);
    assert!(!limiter.check_and_consume("alice").allowed);

    clock.set(60_000);
    let decision = limiter.check_and_consume("alice");
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 1);
    assert_eq!(decision.reset_at_ms, 120_000);

    let window = store.window("alice", WindowKind::Minute).expect("window tracked");
    assert_eq!(*window.count(), 1);
}

#[test]
fn rejection_counts_nothing_in_any_window() {
    let (limiter, store, clock) = limiter(
        vec![
            WindowConfig::new(WindowKind::Minute, 2),
            WindowConfig::new(WindowKind::Hour, 3),
        ],
        0,
    );

    assert!(limiter.check_and_consume("alice").allowed);
    assert!(limiter.check_and_consume("alice").allowed);

    clock.set(1);
    let rejected = limiter.check_and_consume("alice");
    assert_eq!(rejected.limited_by, Some(WindowKind::Minute));
    let hour = store.window("alice", WindowKind::Hour).expect("hour window");
    assert_eq!(*hour.count(), 2);

    clock.set(60_000);
    let allowed = limiter.check_and_consume("alice");
    assert!(allowed.allowed);
    // The hour window is now the tightest.
    assert_eq!(allowed.remaining, 0);
    assert_eq!(allowed.reset_at_ms, 3_600_000);

    clock.set(60_001);
    let rejected = limiter.check_and_consume("alice");
    assert!(!rejected.allowed);
    assert_eq!(rejected.limited_by, Some(WindowKind::Hour));
    assert_eq!(rejected.reset_at_ms, 3_600_000);
    let minute = store.window("alice", WindowKind::Minute).expect("minute window");
    assert_eq!(*minute.count(), 1);
}

#[test]
fn principals_never_share_windows() {
    let (limiter, _store, _clock) = limiter(vec![WindowConfig::new(WindowKind::Day, 1)], 0);

    assert!(limiter.check_and_consume("alice").allowed);
    assert!(!limiter.check_and_consume("alice").allowed);
    assert!(limiter.check_and_consume("bob").allowed);
}

#[test]
fn enforce_reports_exceeded_window_and_reset() {
    let (limiter, _store, _clock) = limiter(vec![WindowConfig::new(WindowKind::Hour, 1)], 5_000);

    assert!(limiter.enforce("alice").is_ok());
    let err = limiter.enforce("alice").expect_err("second request is limited");
    assert_eq!(err.reset_at_ms(), Some(3_605_000));
    match err.kind() {
        RateLimitErrorKind::Exceeded { window, .. } => assert_eq!(window, "hour"),
        other => panic!("unexpected kind: {other:?}"),
    }
}

#[test]
fn empty_policy_allows_everything() {
    let (limiter, store, _clock) = limiter(Vec::new(), 0);
    for _ in 0..100 {
        assert!(limiter.check_and_consume("alice").allowed);
    }
    assert_eq!(store.tracked_windows(), 0);
}

#[test]
fn policy_rejects_zero_and_duplicate_windows() {
    assert!(RateLimitPolicy::new(vec![WindowConfig::new(WindowKind::Minute, 0)]).is_err());
    assert!(
        RateLimitPolicy::new(vec![
            WindowConfig::new(WindowKind::Minute, 1),
            WindowConfig::new(WindowKind::Minute, 2),
        ])
        .is_err()
    );
}

#[test]
fn sweep_removes_only_expired_windows() {
    let store = InMemoryRateLimitStore::new();
    let minute = [WindowConfig::new(WindowKind::Minute, 5)];

    store.check_and_consume("alice", &minute, 0);
    store.check_and_consume("bob", &minute, 30_000);
    assert_eq!(store.tracked_windows(), 2);

    assert_eq!(store.sweep_expired(60_000), 1);
    assert_eq!(store.tracked_windows(), 1);
    assert!(store.window("alice", WindowKind::Minute).is_none());
    assert!(store.window("bob", WindowKind::Minute).is_some());
}

#[test]
fn bounded_store_evicts_window_closest_to_expiry() {
    let store = InMemoryRateLimitStore::new().with_max_tracked_windows(2);
    let minute = [WindowConfig::new(WindowKind::Minute, 5)];

    store.check_and_consume("alice", &minute, 0);
    store.check_and_consume("bob", &minute, 10);
    store.check_and_consume("carol", &minute, 20);

    assert_eq!(store.tracked_windows(), 2);
    assert!(store.window("alice", WindowKind::Minute).is_none());
    assert!(store.window("bob", WindowKind::Minute).is_some());
    assert!(store.window("carol", WindowKind::Minute).is_some());
}

#[test]
fn bounded_store_prefers_sweeping_expired_windows() {
    let store = InMemoryRateLimitStore::new().with_max_tracked_windows(2);
    let minute = [WindowConfig::new(WindowKind::Minute, 5)];

    store.check_and_consume("alice", &minute, 0);
    store.check_and_consume("bob", &minute, 10);
    store.check_and_consume("carol", &minute, 60_005);

    assert!(store.window("alice", WindowKind::Minute).is_none());
    assert!(store.window("bob", WindowKind::Minute).is_some());
    assert!(store.window("carol", WindowKind::Minute).is_some());
}

#[test]
fn concurrent_requests_never_exceed_the_limit() {
    let (limiter, store, _clock) = limiter(vec![WindowConfig::new(WindowKind::Minute, 100)], 0);
    let allowed = AtomicU32::new(0);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..50 {
                    if limiter.check_and_consume("alice").allowed {
                        allowed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    assert_eq!(allowed.load(Ordering::SeqCst), 100);
    let window = store.window("alice", WindowKind::Minute).expect("window tracked");
    assert_eq!(*window.count(), 100);
}

#[tokio::test]
async fn sweeper_deletes_expired_windows_in_background() {
    let (limiter, store, clock) = limiter(vec![WindowConfig::new(WindowKind::Minute, 5)], 0);
    limiter.check_and_consume("alice");
    limiter.check_and_consume("bob");
    assert_eq!(store.tracked_windows(), 2);

    clock.set(120_000);
    let sweeper = limiter.spawn_sweeper(Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(100)).await;
    sweeper.abort();

    assert_eq!(store.tracked_windows(), 0);
}

#[test]
fn config_defaults_and_deserialization() {
    let defaults = RateLimitConfig::default();
    assert_eq!(defaults.policy().windows().len(), 3);
    assert_eq!(defaults.sweep_interval(), Duration::from_secs(300));

    let config: RateLimitConfig = serde_json::from_str(
        r#"{"windows":[{"kind":"minute","max_requests":2}],"max_tracked_windows":10}"#,
    )
    .expect("valid config");
    assert_eq!(
        config.policy().windows(),
        &[WindowConfig::new(WindowKind::Minute, 2)]
    );
    assert_eq!(*config.max_tracked_windows(), Some(10));

    let invalid = serde_json::from_str::<RateLimitConfig>(
        r#"{"windows":[{"kind":"minute","max_requests":0}]}"#,
    );
    assert!(invalid.is_err());
}

#[test]
fn config_rejects_bound_below_window_count() {
    let config = RateLimitConfig::default().with_max_tracked_windows(2);
    let err = config.validate().expect_err("bound too small for three windows");
    assert!(matches!(err.kind(), RateLimitErrorKind::Config(message) if message.contains("max_tracked_windows")));

    assert!(RateLimitConfig::default().with_max_tracked_windows(3).validate().is_ok());
    assert!(RateLimitConfig::default().validate().is_ok());
}
