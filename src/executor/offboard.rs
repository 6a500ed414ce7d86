//! Offboard setpoint streaming.
//!
//! Offboard mode lapses if the flight controller stops receiving
//! setpoints for longer than its inactivity window (~500 ms), so while
//! movement or rotation commands are active a background task re-sends
//! the current target well under that interval (100 ms default). The
//! execution machine retargets the stream; the task keeps it alive.

use crate::config::{StreamConfig, Timeouts};
use crate::error::CallOutcome;
use crate::error::FlightError;
use crate::flight::supervisor::{supervise, OpClass};
use crate::flight::traits::FlightControl;
use crate::state::{Setpoint, VehicleState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

pub struct OffboardStream {
    control: Arc<dyn FlightControl>,
    stream_config: StreamConfig,
    timeouts: Timeouts,
    /// Shared vehicle state; this task writes only `offboard_active`
    vehicle: Arc<RwLock<VehicleState>>,
    target_tx: watch::Sender<Setpoint>,
    running: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl OffboardStream {
    pub fn new(
        control: Arc<dyn FlightControl>,
        stream_config: StreamConfig,
        timeouts: Timeouts,
        vehicle: Arc<RwLock<VehicleState>>,
    ) -> Self {
        let (target_tx, _) = watch::channel(Setpoint::default());
        Self {
            control,
            stream_config,
            timeouts,
            vehicle,
            target_tx,
            running: Arc::new(AtomicBool::new(false)),
            failed: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.failed.load(Ordering::SeqCst)
    }

    /// A setpoint emission missed its deadline; movement commands must
    /// not proceed until the stream is re-established.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Current stream target
    pub fn target(&self) -> Setpoint {
        *self.target_tx.borrow()
    }

    /// Point the stream at a new position/yaw target
    pub fn retarget(&self, setpoint: Setpoint) {
        let _ = self.target_tx.send(setpoint);
    }

    /// Start offboard mode and the streaming task if not already live.
    ///
    /// Primes the stream with the vehicle's current position and yaw,
    /// sends one setpoint, then requests the mode switch, all under the
    /// offboard deadline.
    pub async fn ensure_active(&mut self) -> Result<(), FlightError> {
        if self.is_active() {
            return Ok(());
        }
        if self.has_failed() {
            // Previous stream lapsed; tear it down before restarting
            self.shutdown_task();
            let _ = supervise(
                OpClass::Offboard,
                &self.timeouts,
                self.control.stop_offboard(),
            )
            .await;
            self.failed.store(false, Ordering::SeqCst);
        }

        let position = match supervise(
            OpClass::Offboard,
            &self.timeouts,
            self.control.query_position(),
        )
        .await
        {
            CallOutcome::Ok(p) => p,
            CallOutcome::TimedOut => {
                return Err(FlightError::Offboard("position query timed out".into()))
            }
            CallOutcome::Err(e) => return Err(e),
        };

        let prime = Setpoint {
            north_m: position.north_m,
            east_m: position.east_m,
            down_m: position.down_m,
            yaw_deg: position.yaw_deg,
        };
        let _ = self.target_tx.send(prime);

        match supervise(
            OpClass::Offboard,
            &self.timeouts,
            self.control.send_setpoint(prime),
        )
        .await
        {
            CallOutcome::Ok(()) => {}
            CallOutcome::TimedOut => {
                return Err(FlightError::Offboard("priming setpoint timed out".into()))
            }
            CallOutcome::Err(e) => return Err(e),
        }

        match supervise(
            OpClass::Offboard,
            &self.timeouts,
            self.control.start_offboard(),
        )
        .await
        {
            CallOutcome::Ok(()) => {}
            CallOutcome::TimedOut => {
                return Err(FlightError::Offboard("offboard start timed out".into()))
            }
            CallOutcome::Err(e) => return Err(e),
        }

        self.vehicle.write().await.offboard_active = true;
        self.spawn_stream_task();
        debug!("Offboard stream active");
        Ok(())
    }

    fn spawn_stream_task(&mut self) {
        self.running.store(true, Ordering::SeqCst);
        let control = self.control.clone();
        let running = self.running.clone();
        let failed = self.failed.clone();
        let vehicle = self.vehicle.clone();
        let timeouts = self.timeouts.clone();
        let mut target_rx = self.target_tx.subscribe();
        let cadence = self.stream_config.setpoint_interval;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval(cadence);
            loop {
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let target = *target_rx.borrow_and_update();
                match supervise(OpClass::Offboard, &timeouts, control.send_setpoint(target)).await
                {
                    CallOutcome::Ok(()) => {}
                    CallOutcome::TimedOut => {
                        warn!("Setpoint emission missed its deadline, offboard lapsed");
                        failed.store(true, Ordering::SeqCst);
                        running.store(false, Ordering::SeqCst);
                        vehicle.write().await.offboard_active = false;
                        break;
                    }
                    CallOutcome::Err(e) => {
                        warn!("Setpoint emission failed: {}", e);
                        failed.store(true, Ordering::SeqCst);
                        running.store(false, Ordering::SeqCst);
                        vehicle.write().await.offboard_active = false;
                        break;
                    }
                }
            }
        }));
    }

    fn shutdown_task(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Halt streaming and leave offboard mode, restoring the prior
    /// flight mode. Safe to call when already inactive.
    pub async fn stop(&mut self) {
        // A failed stream left the flight controller in offboard mode
        // even though the task is gone; it still needs the mode switch.
        let was_live =
            self.running.load(Ordering::SeqCst) || self.failed.load(Ordering::SeqCst);
        self.shutdown_task();
        if was_live || self.vehicle.read().await.offboard_active {
            match supervise(
                OpClass::Offboard,
                &self.timeouts,
                self.control.stop_offboard(),
            )
            .await
            {
                CallOutcome::Ok(()) => debug!("Offboard stream stopped"),
                CallOutcome::TimedOut => warn!("Offboard stop timed out, assuming disabled"),
                CallOutcome::Err(e) => warn!("Offboard stop failed: {}", e),
            }
            self.vehicle.write().await.offboard_active = false;
        }
        self.failed.store(false, Ordering::SeqCst);
    }
}
