//! Deadline supervision for blocking collaborator calls.
//!
//! Every call into the flight controller goes through `supervise`, which
//! turns elapsed deadlines into a tagged `CallOutcome` instead of an
//! error path. Only connection establishment is ever retried.

use crate::config::Timeouts;
use crate::error::{CallOutcome, FlightError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Operation classes with distinct deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// Connection establishment
    Connect,
    /// Basic actions: arm, disarm, takeoff, land, hold, RTL
    Action,
    /// Movement and rotation
    Movement,
    /// Offboard mode transitions and setpoint writes
    Offboard,
}

impl OpClass {
    pub fn deadline(&self, timeouts: &Timeouts) -> Duration {
        match self {
            OpClass::Connect => timeouts.connect,
            OpClass::Action => timeouts.action,
            OpClass::Movement => timeouts.movement,
            OpClass::Offboard => timeouts.offboard,
        }
    }
}

/// Run a collaborator call under its class deadline. An abandoned call
/// is reported as `TimedOut`; the caller treats vehicle state as unknown
/// until re-queried.
pub async fn supervise<T, F>(class: OpClass, timeouts: &Timeouts, fut: F) -> CallOutcome<T>
where
    F: Future<Output = Result<T, FlightError>>,
{
    match timeout(class.deadline(timeouts), fut).await {
        Ok(Ok(value)) => CallOutcome::Ok(value),
        Ok(Err(e)) => CallOutcome::Err(e),
        Err(_) => CallOutcome::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_timeouts() -> Timeouts {
        Timeouts {
            connect: Duration::from_millis(50),
            action: Duration::from_millis(50),
            movement: Duration::from_millis(50),
            offboard: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_completed_call_is_ok() {
        let outcome = supervise(OpClass::Action, &fast_timeouts(), async { Ok(42u32) }).await;
        assert!(matches!(outcome, CallOutcome::Ok(42)));
    }

    #[tokio::test]
    async fn test_collaborator_error_passes_through() {
        let outcome: CallOutcome<()> = supervise(OpClass::Action, &fast_timeouts(), async {
            Err(FlightError::Action("denied".into()))
        })
        .await;
        assert!(matches!(outcome, CallOutcome::Err(FlightError::Action(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses_to_timed_out() {
        let outcome: CallOutcome<()> = supervise(OpClass::Action, &fast_timeouts(), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(matches!(outcome, CallOutcome::TimedOut));
    }

    #[test]
    fn test_class_deadlines_from_config() {
        let t = Timeouts::default();
        assert_eq!(OpClass::Connect.deadline(&t), Duration::from_secs(45));
        assert_eq!(OpClass::Action.deadline(&t), Duration::from_secs(15));
        assert_eq!(OpClass::Movement.deadline(&t), Duration::from_secs(20));
        assert_eq!(OpClass::Offboard.deadline(&t), Duration::from_secs(8));
    }
}
