//! Runtime configuration, constructed once in `main` and passed by
//! reference into every component that needs it.

use std::time::Duration;

/// Per-operation-class deadlines for blocking flight-controller calls
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Initial connection establishment
    pub connect: Duration,
    /// Basic actions (arm, disarm, takeoff, land, hold, RTL)
    pub action: Duration,
    /// Movement and rotation commands
    pub movement: Duration,
    /// Offboard mode start/stop and setpoint writes
    pub offboard: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(45),
            action: Duration::from_secs(15),
            movement: Duration::from_secs(20),
            offboard: Duration::from_secs(8),
        }
    }
}

/// Connection retry policy (only connection establishment is retried)
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(3),
            backoff_multiplier: 2,
        }
    }
}

/// Defaults substituted when an utterance carries no magnitude
#[derive(Debug, Clone)]
pub struct Defaults {
    /// Movement distance in meters (10 cm)
    pub move_distance_m: f64,
    /// Rotation angle in degrees
    pub rotate_angle_deg: f64,
    /// Takeoff altitude in meters
    pub takeoff_altitude_m: f64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            move_distance_m: 0.10,
            rotate_angle_deg: 90.0,
            takeoff_altitude_m: 1.0,
        }
    }
}

/// Offboard setpoint streaming cadence
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Interval between setpoint emissions. Must stay well under the
    /// flight controller's offboard inactivity timeout (~500 ms).
    pub setpoint_interval: Duration,
    /// Settle time after retargeting a movement/rotation setpoint,
    /// checked in 100 ms slices for cancellation.
    pub settle_time: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            setpoint_interval: Duration::from_millis(100),
            settle_time: Duration::from_secs(1),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Flight controller connection path (e.g. "udp://:14540")
    pub connection_path: String,
    /// Run against the in-memory simulated vehicle instead of hardware
    pub sim_mode: bool,
    pub timeouts: Timeouts,
    pub retry: RetryPolicy,
    pub defaults: Defaults,
    pub stream: StreamConfig,
    /// Forwarded to the audio capture collaborator only
    pub noise_injection: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_path: "udp://:14540".into(),
            sim_mode: true,
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
            defaults: Defaults::default(),
            stream: StreamConfig::default(),
            noise_injection: false,
        }
    }
}
