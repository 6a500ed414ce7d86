//! Vehicle state tracking.
//!
//! The execution state machine owns the authoritative `VehicleState`;
//! everyone else sees read-only snapshots. State is mutated only after a
//! confirmed collaborator response, never optimistically.

/// Flight controller mode as reported by telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightMode {
    #[default]
    Unknown,
    Manual,
    Hold,
    Takeoff,
    Land,
    ReturnToLaunch,
    Offboard,
}

impl std::fmt::Display for FlightMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FlightMode::Unknown => "UNKNOWN",
            FlightMode::Manual => "MANUAL",
            FlightMode::Hold => "HOLD",
            FlightMode::Takeoff => "TAKEOFF",
            FlightMode::Land => "LAND",
            FlightMode::ReturnToLaunch => "RTL",
            FlightMode::Offboard => "OFFBOARD",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of everything the precondition checks care about
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleState {
    pub connected: bool,
    pub armed: bool,
    pub airborne: bool,
    pub flight_mode: FlightMode,
    pub gps_fix_ok: bool,
    pub offboard_active: bool,
}

impl VehicleState {
    /// Reset everything on a confirmed disconnect
    pub fn reset(&mut self) {
        *self = VehicleState::default();
    }
}

/// Position setpoint in the NED (North East Down) frame with yaw
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Setpoint {
    pub north_m: f64,
    pub east_m: f64,
    pub down_m: f64,
    pub yaw_deg: f64,
}

/// Current vehicle position in the NED frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NedPosition {
    pub north_m: f64,
    pub east_m: f64,
    pub down_m: f64,
    pub yaw_deg: f64,
}
