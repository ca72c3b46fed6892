use super::*;

fn limiter() -> RateLimiter {
    RateLimiter::new(3, Duration::from_secs(10))
}

#[test]
fn allows_up_to_limit() {
    let rl = limiter();
    let client = Uuid::new_v4();
    let now = Instant::now();

    for i in 0..3 {
        assert!(rl.check_and_record_at(client, now).is_ok(), "message {i} should pass");
    }
    let err = rl.check_and_record_at(client, now).expect_err("fourth message should fail");
    assert_eq!(err.limit, 3);
    assert_eq!(err.window_secs, 10);
}

#[test]
fn clients_are_limited_independently() {
    let rl = limiter();
    let now = Instant::now();
    let noisy = Uuid::new_v4();
    for _ in 0..3 {
        rl.check_and_record_at(noisy, now).expect("within limit");
    }
    assert!(rl.check_and_record_at(noisy, now).is_err());
    assert!(rl.check_and_record_at(Uuid::new_v4(), now).is_ok());
}

#[test]
fn window_expiry_frees_capacity() {
    let rl = limiter();
    let client = Uuid::new_v4();
    let start = Instant::now();
    for _ in 0..3 {
        rl.check_and_record_at(client, start).expect("within limit");
    }
    let later = start + Duration::from_secs(11);
    assert!(rl.check_and_record_at(client, later).is_ok());
}

#[test]
fn rejected_attempts_are_not_recorded() {
    let rl = RateLimiter::new(1, Duration::from_secs(10));
    let client = Uuid::new_v4();
    let start = Instant::now();
    rl.check_and_record_at(client, start).expect("first");
    assert!(rl.check_and_record_at(client, start + Duration::from_secs(5)).is_err());
    assert!(rl.check_and_record_at(client, start + Duration::from_secs(11)).is_ok());
}

#[test]
fn forget_drops_client_state() {
    let rl = limiter();
    let client = Uuid::new_v4();
    rl.check_and_record(client).expect("first");
    assert_eq!(rl.tracked_clients(), 1);
    rl.forget(client);
    assert_eq!(rl.tracked_clients(), 0);
}

#[test]
fn error_is_retryable_with_code() {
    let err = RateLimitError { limit: 5, window_secs: 10 };
    assert_eq!(err.error_code(), "E_RATE_LIMITED");
    assert!(err.retryable());
    assert_eq!(err.to_string(), "too many messages (max 5 per 10s)");
}
