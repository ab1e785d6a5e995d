use failsafe::backoff::{self, Exponential};
use failsafe::failure_policy::{self, ConsecutiveFailures};
use failsafe::{Config, StateMachine};
use std::time::Duration;

/// Circuit breaker guarding one external source.
pub type SourceBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Consecutive failures that open a source's circuit.
pub const FAILURE_THRESHOLD: u32 = 5;

/// Creates a circuit breaker for an external source so a dead endpoint
/// stops costing a full timeout per lead.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, requests pass through.
/// - **OPEN**: Too many failures, requests fail fast and the adapter reports
///   itself unavailable.
/// - **HALF_OPEN**: Testing if the source recovered.
pub fn create_source_circuit_breaker() -> SourceBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(FAILURE_THRESHOLD, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

/// Delays between retries of a transient source failure.
pub fn retry_delays() -> Exponential {
    backoff::exponential(Duration::from_secs(1), Duration::from_secs(16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::{CircuitBreaker, Error};

    #[test]
    fn test_circuit_breaker_opens_after_failures() {
        let cb = create_source_circuit_breaker();

        for _ in 0..FAILURE_THRESHOLD {
            let result: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("simulated error"));
            assert!(result.is_err());
        }

        let result: Result<(), Error<&str>> = cb.call(|| Ok::<(), &str>(()));

        match result {
            Err(Error::Rejected) => {}
            _ => panic!("Expected circuit to be open and reject requests"),
        }
    }

    #[test]
    fn test_circuit_breaker_allows_success() {
        let cb = create_source_circuit_breaker();

        let result: Result<i32, Error<&str>> = cb.call(|| Ok::<i32, &str>(42));

        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_retry_delays_grow_and_cap() {
        let delays: Vec<Duration> = retry_delays().take(8).collect();
        assert_eq!(delays.len(), 8);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(16)));
    }
}
