//! Collaborator trait boundary for the flight controller.
//!
//! The transport and protocol implementation live outside this crate;
//! the executor sees only these calls. Every call is expected to either
//! complete within the supervisor's deadline or be abandoned.

use crate::error::FlightError;
use crate::state::{NedPosition, Setpoint, VehicleState};
use async_trait::async_trait;
use std::sync::Arc;

/// Direct actions on a connected vehicle
#[async_trait]
pub trait FlightControl: Send + Sync {
    async fn arm(&self) -> Result<(), FlightError>;
    async fn disarm(&self) -> Result<(), FlightError>;
    async fn takeoff(&self, altitude_m: f64) -> Result<(), FlightError>;
    async fn land(&self) -> Result<(), FlightError>;
    /// Position hold at the current location (the STOP action)
    async fn hold(&self) -> Result<(), FlightError>;
    async fn return_to_launch(&self) -> Result<(), FlightError>;
    async fn start_offboard(&self) -> Result<(), FlightError>;
    async fn stop_offboard(&self) -> Result<(), FlightError>;
    async fn send_setpoint(&self, setpoint: Setpoint) -> Result<(), FlightError>;
    /// Fresh state snapshot straight from telemetry
    async fn query_state(&self) -> Result<VehicleState, FlightError>;
    /// Current NED position and yaw, used to prime the offboard stream
    async fn query_position(&self) -> Result<NedPosition, FlightError>;
}

/// Connection establishment collaborator
#[async_trait]
pub trait FlightConnector: Send + Sync {
    async fn connect(&self, path: &str) -> Result<Arc<dyn FlightControl>, FlightError>;
}

/// Lifecycle hook supplied by the embedding application; the core only
/// decides when to invoke it (the SHUTDOWN command).
pub trait PowerHook: Send + Sync {
    fn request_system_power_off(&self);
}
