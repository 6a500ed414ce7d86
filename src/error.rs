//! Error taxonomy.
//!
//! All of these are recovered locally inside the execution state machine;
//! the only path out of the process is exhaustion of connection retries,
//! which transitions the system to the failsafe-reporting state.

use thiserror::Error;

/// A segment of an utterance that matched no known command keyword.
/// Logged and dropped; the rest of the chain still parses.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("unrecognized command segment: '{segment}'")]
pub struct ParseError {
    pub segment: String,
}

/// Failures reported by the flight-control collaborator
#[derive(Debug, Clone, Error)]
pub enum FlightError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("action rejected: {0}")]
    Action(String),
    #[error("offboard error: {0}")]
    Offboard(String),
    #[error("link to vehicle lost")]
    Lost,
}

/// Result of a supervised collaborator call: completed, hit its
/// deadline, or failed outright. Timeouts are data, not exceptions.
#[derive(Debug)]
pub enum CallOutcome<T> {
    Ok(T),
    TimedOut,
    Err(FlightError),
}
