//! Command execution: queueing, the execution state machine, offboard
//! setpoint streaming, and cooperative STOP cancellation.

pub mod machine;
pub mod offboard;
pub mod queue;

pub use machine::{run_failsafe, ExecutionMachine};
pub use offboard::OffboardStream;
pub use queue::ChainQueue;

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Cooperative cancellation for STOP.
///
/// The flag is checked between state-machine steps; the notify wakes the
/// machine when it is idle. In-flight collaborator calls are never
/// forcibly aborted, their results are discarded instead.
#[derive(Default)]
pub struct CancelToken {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub async fn triggered(&self) {
        if self.is_set() {
            return;
        }
        self.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_flag() {
        let token = CancelToken::default();
        assert!(!token.is_set());
        token.trigger();
        assert!(token.is_set());
        token.reset();
        assert!(!token.is_set());
    }

    #[tokio::test]
    async fn test_triggered_returns_immediately_when_set() {
        let token = CancelToken::default();
        token.trigger();
        token.triggered().await;
    }
}
