use std::time::Duration;

use tokio::time::Instant;

use super::retry_transient;
use super::RetryPolicy;
use crate::domain::models::GenerationError;
use crate::domain::models::ProviderError;

fn overloaded() -> ProviderError {
    return ProviderError::new(Some(503), Some("UNAVAILABLE"), "The model is overloaded.");
}

#[test]
fn it_grows_delays_linearly() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.delay_for(1), Duration::from_millis(3000));
    assert_eq!(policy.delay_for(2), Duration::from_millis(6000));
    assert_eq!(policy.delay_for(3), Duration::from_millis(9000));
}

#[tokio::test(start_paused = true)]
async fn it_returns_the_first_success() {
    let mut calls = 0;
    let res = retry_transient(&RetryPolicy::default(), |_attempt| {
        calls += 1;
        return async { return Ok::<&str, ProviderError>("4") };
    })
    .await;

    assert_eq!(res, Ok("4"));
    assert_eq!(calls, 1);
}

#[tokio::test(start_paused = true)]
async fn it_stops_after_three_transient_failures() {
    let mut attempts: Vec<u32> = vec![];
    let res = retry_transient(&RetryPolicy::default(), |attempt| {
        attempts.push(attempt);
        return async { return Err::<String, ProviderError>(overloaded()) };
    })
    .await;

    assert_eq!(attempts, vec![1, 2, 3]);
    assert_eq!(res, Err(GenerationError::RetriesExhausted(overloaded())));
}

#[tokio::test(start_paused = true)]
async fn it_waits_between_attempts() {
    let mut started: Vec<Instant> = vec![];
    let _ = retry_transient(&RetryPolicy::default(), |_attempt| {
        started.push(Instant::now());
        return async { return Err::<String, ProviderError>(overloaded()) };
    })
    .await;

    assert_eq!(started.len(), 3);
    assert_eq!(started[1] - started[0], Duration::from_millis(3000));
    assert_eq!(started[2] - started[1], Duration::from_millis(6000));
}

#[tokio::test(start_paused = true)]
async fn it_recovers_after_a_transient_failure() {
    let res = retry_transient(&RetryPolicy::default(), |attempt| {
        return async move {
            if attempt == 1 {
                return Err(ProviderError::transport("hit the rate limit"));
            }
            return Ok("recovered".to_string());
        };
    })
    .await;

    assert_eq!(res, Ok("recovered".to_string()));
}

#[tokio::test(start_paused = true)]
async fn it_does_not_retry_fatal_errors() {
    let start = Instant::now();
    let mut calls = 0;
    let fatal = ProviderError::new(Some(400), Some("INVALID_ARGUMENT"), "API key not valid");
    let res = retry_transient(&RetryPolicy::default(), |_attempt| {
        calls += 1;
        let err = fatal.clone();
        return async move { return Err::<String, ProviderError>(err) };
    })
    .await;

    assert_eq!(calls, 1);
    assert_eq!(res, Err(GenerationError::Fatal(fatal)));
    assert_eq!(Instant::now() - start, Duration::ZERO);
}

#[tokio::test]
async fn it_fails_without_attempts() {
    let policy = RetryPolicy {
        max_attempts: 0,
        base_delay: Duration::from_millis(1),
    };
    let res = retry_transient(&policy, |_attempt| {
        return async { return Ok::<&str, ProviderError>("unreachable") };
    })
    .await;

    assert_eq!(res, Err(GenerationError::MaxRetriesExceeded));
}
