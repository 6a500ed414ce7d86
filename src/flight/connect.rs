//! Connection establishment with bounded retry and exponential backoff.
//!
//! This is the only operation class that retries. Exhausting the retry
//! budget is terminal: the caller transitions the system into the
//! failsafe-reporting state rather than looping or crashing.

use super::supervisor::{supervise, OpClass};
use super::traits::{FlightConnector, FlightControl};
use crate::config::Config;
use crate::error::{CallOutcome, FlightError};
use std::sync::Arc;
use tracing::{info, warn};

/// Attempt to connect up to `retry.max_attempts` times with exponential
/// backoff between attempts. Each attempt runs under the connect
/// deadline.
pub async fn connect_with_retry(
    connector: &dyn FlightConnector,
    config: &Config,
) -> Result<Arc<dyn FlightControl>, FlightError> {
    let mut delay = config.retry.initial_delay;
    let mut last_error = FlightError::Connection("no attempts made".into());

    for attempt in 1..=config.retry.max_attempts {
        info!(
            "Connecting to vehicle at {} (attempt {}/{})",
            config.connection_path, attempt, config.retry.max_attempts
        );

        let outcome = supervise(
            OpClass::Connect,
            &config.timeouts,
            connector.connect(&config.connection_path),
        )
        .await;

        match outcome {
            CallOutcome::Ok(control) => {
                info!("Vehicle connection confirmed");
                return Ok(control);
            }
            CallOutcome::TimedOut => {
                warn!("Connection attempt {} timed out", attempt);
                last_error = FlightError::Connection("connection attempt timed out".into());
            }
            CallOutcome::Err(e) => {
                warn!("Connection attempt {} failed: {}", attempt, e);
                last_error = e;
            }
        }

        if attempt < config.retry.max_attempts {
            info!("Retrying in {:?}", delay);
            tokio::time::sleep(delay).await;
            delay *= config.retry.backoff_multiplier;
        }
    }

    Err(FlightError::Connection(format!(
        "connection failed after {} attempts: {}",
        config.retry.max_attempts, last_error
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Fails a fixed number of times, then succeeds, recording the time
    /// of each attempt.
    struct FlakyConnector {
        failures: u32,
        attempts: AtomicU32,
        attempt_times: Mutex<Vec<Instant>>,
    }

    impl FlakyConnector {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
                attempt_times: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FlightConnector for FlakyConnector {
        async fn connect(&self, _path: &str) -> Result<Arc<dyn FlightControl>, FlightError> {
            self.attempt_times.lock().unwrap().push(Instant::now());
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(FlightError::Connection(format!("attempt {} refused", n)))
            } else {
                Ok(Arc::new(crate::flight::sim::SimFlightControl::new_connected()))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fail_succeed_is_three_attempts() {
        let connector = FlakyConnector::new(2);
        let config = Config::default();

        let result = connect_with_retry(&connector, &config).await;
        assert!(result.is_ok());
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);

        // Backoff between attempts is non-decreasing
        let times = connector.attempt_times.lock().unwrap();
        let gap1 = times[1] - times[0];
        let gap2 = times[2] - times[1];
        assert!(gap2 >= gap1);
        assert!(gap1 >= config.retry.initial_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_is_terminal_error() {
        let connector = FlakyConnector::new(10);
        let config = Config::default();

        let result = connect_with_retry(&connector, &config).await;
        assert!(result.is_err());
        assert_eq!(
            connector.attempts.load(Ordering::SeqCst),
            config.retry.max_attempts
        );
    }
}
