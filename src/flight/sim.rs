//! In-memory simulated vehicle.
//!
//! Confirms every action immediately and tracks the state a real
//! flight controller would report. Backs sim mode in the binary and the
//! executor tests.

use super::traits::{FlightConnector, FlightControl};
use crate::error::FlightError;
use crate::state::{FlightMode, NedPosition, Setpoint, VehicleState};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct SimVehicle {
    state: VehicleState,
    position: NedPosition,
}

/// Simulated flight controller
#[derive(Default)]
pub struct SimFlightControl {
    vehicle: RwLock<SimVehicle>,
}

impl SimFlightControl {
    pub fn new_connected() -> Self {
        Self {
            vehicle: RwLock::new(SimVehicle {
                state: VehicleState {
                    connected: true,
                    gps_fix_ok: true,
                    flight_mode: FlightMode::Manual,
                    ..VehicleState::default()
                },
                position: NedPosition::default(),
            }),
        }
    }
}

#[async_trait]
impl FlightControl for SimFlightControl {
    async fn arm(&self) -> Result<(), FlightError> {
        let mut v = self.vehicle.write().await;
        if v.state.armed {
            return Err(FlightError::Action("already armed".into()));
        }
        v.state.armed = true;
        debug!("[SIM] armed");
        Ok(())
    }

    async fn disarm(&self) -> Result<(), FlightError> {
        let mut v = self.vehicle.write().await;
        if v.state.airborne {
            return Err(FlightError::Action("cannot disarm in air".into()));
        }
        v.state.armed = false;
        debug!("[SIM] disarmed");
        Ok(())
    }

    async fn takeoff(&self, altitude_m: f64) -> Result<(), FlightError> {
        let mut v = self.vehicle.write().await;
        if !v.state.armed {
            return Err(FlightError::Action("not armed".into()));
        }
        v.state.airborne = true;
        v.state.flight_mode = FlightMode::Takeoff;
        v.position.down_m = -altitude_m;
        debug!("[SIM] takeoff to {altitude_m}m");
        Ok(())
    }

    async fn land(&self) -> Result<(), FlightError> {
        let mut v = self.vehicle.write().await;
        v.state.airborne = false;
        v.state.flight_mode = FlightMode::Land;
        v.state.offboard_active = false;
        v.position.down_m = 0.0;
        debug!("[SIM] landed");
        Ok(())
    }

    async fn hold(&self) -> Result<(), FlightError> {
        let mut v = self.vehicle.write().await;
        v.state.flight_mode = FlightMode::Hold;
        debug!("[SIM] position hold");
        Ok(())
    }

    async fn return_to_launch(&self) -> Result<(), FlightError> {
        let mut v = self.vehicle.write().await;
        v.state.flight_mode = FlightMode::ReturnToLaunch;
        v.position = NedPosition {
            down_m: v.position.down_m,
            ..NedPosition::default()
        };
        debug!("[SIM] return to launch");
        Ok(())
    }

    async fn start_offboard(&self) -> Result<(), FlightError> {
        let mut v = self.vehicle.write().await;
        if !v.state.armed || !v.state.airborne {
            return Err(FlightError::Offboard("vehicle not flying".into()));
        }
        v.state.offboard_active = true;
        v.state.flight_mode = FlightMode::Offboard;
        debug!("[SIM] offboard started");
        Ok(())
    }

    async fn stop_offboard(&self) -> Result<(), FlightError> {
        let mut v = self.vehicle.write().await;
        v.state.offboard_active = false;
        v.state.flight_mode = FlightMode::Hold;
        debug!("[SIM] offboard stopped");
        Ok(())
    }

    async fn send_setpoint(&self, setpoint: Setpoint) -> Result<(), FlightError> {
        let mut v = self.vehicle.write().await;
        // The sim vehicle tracks setpoints instantly
        v.position = NedPosition {
            north_m: setpoint.north_m,
            east_m: setpoint.east_m,
            down_m: setpoint.down_m,
            yaw_deg: setpoint.yaw_deg,
        };
        Ok(())
    }

    async fn query_state(&self) -> Result<VehicleState, FlightError> {
        Ok(self.vehicle.read().await.state)
    }

    async fn query_position(&self) -> Result<NedPosition, FlightError> {
        Ok(self.vehicle.read().await.position)
    }
}

/// Connector that hands out an already-connected simulated vehicle
pub struct SimConnector;

#[async_trait]
impl FlightConnector for SimConnector {
    async fn connect(&self, path: &str) -> Result<Arc<dyn FlightControl>, FlightError> {
        debug!("[SIM] connect to {path}");
        Ok(Arc::new(SimFlightControl::new_connected()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sim_arm_takeoff_land_cycle() {
        let sim = SimFlightControl::new_connected();
        sim.arm().await.unwrap();
        sim.takeoff(1.0).await.unwrap();
        let state = sim.query_state().await.unwrap();
        assert!(state.armed && state.airborne);
        sim.land().await.unwrap();
        sim.disarm().await.unwrap();
        let state = sim.query_state().await.unwrap();
        assert!(!state.armed && !state.airborne);
    }

    #[tokio::test]
    async fn test_sim_rejects_disarm_in_air() {
        let sim = SimFlightControl::new_connected();
        sim.arm().await.unwrap();
        sim.takeoff(1.0).await.unwrap();
        assert!(sim.disarm().await.is_err());
    }

    #[tokio::test]
    async fn test_sim_offboard_requires_flight() {
        let sim = SimFlightControl::new_connected();
        assert!(sim.start_offboard().await.is_err());
        sim.arm().await.unwrap();
        sim.takeoff(1.0).await.unwrap();
        sim.start_offboard().await.unwrap();
        let state = sim.query_state().await.unwrap();
        assert!(state.offboard_active);
        assert_eq!(state.flight_mode, FlightMode::Offboard);
    }
}
