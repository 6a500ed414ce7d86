//! Execution state machine.
//!
//! The single sequential consumer of parsed command chains. Each command
//! passes through `Validating` (precondition check against the current
//! vehicle state), `Dispatching` (exactly one collaborator call), and
//! `AwaitingResult` (blocked under the supervisor's deadline), then the
//! machine returns to `Idle`. Precondition failures are local: the rest
//! of the chain still runs. STOP preempts everything, cooperatively.

use super::offboard::OffboardStream;
use super::queue::ChainQueue;
use super::CancelToken;
use crate::command::{AtomicCommand, CommandChain, CommandKind, Direction, ExecutionResult, Outcome};
use crate::config::Config;
use crate::error::{CallOutcome, FlightError};
use crate::flight::supervisor::{supervise, OpClass};
use crate::flight::traits::{FlightControl, PowerHook};
use crate::logging::{log_event, EventSink};
use crate::state::{FlightMode, Setpoint, VehicleState};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

/// Machine phase, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Dispatching,
    AwaitingResult,
}

pub struct ExecutionMachine {
    control: Arc<dyn FlightControl>,
    config: Config,
    vehicle: Arc<RwLock<VehicleState>>,
    stream: OffboardStream,
    queue: ChainQueue,
    chain_rx: mpsc::UnboundedReceiver<CommandChain>,
    cancel: Arc<CancelToken>,
    sink: Arc<dyn EventSink>,
    power: Arc<dyn PowerHook>,
    phase: Phase,
    /// Set after a timeout; forces a fresh state query before the next
    /// dispatch
    state_unknown: bool,
    shutdown_requested: bool,
}

impl ExecutionMachine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        control: Arc<dyn FlightControl>,
        config: Config,
        chain_rx: mpsc::UnboundedReceiver<CommandChain>,
        cancel: Arc<CancelToken>,
        sink: Arc<dyn EventSink>,
        power: Arc<dyn PowerHook>,
    ) -> Self {
        let vehicle = Arc::new(RwLock::new(VehicleState::default()));
        let stream = OffboardStream::new(
            control.clone(),
            config.stream.clone(),
            config.timeouts.clone(),
            vehicle.clone(),
        );
        Self {
            control,
            config,
            vehicle,
            stream,
            queue: ChainQueue::new(),
            chain_rx,
            cancel,
            sink,
            power,
            phase: Phase::Idle,
            state_unknown: true,
            shutdown_requested: false,
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            log_event(
                &self.sink,
                format!("state transition: {:?} -> {:?}", self.phase, phase),
            );
            self.phase = phase;
        }
    }

    /// Run until the chain channel closes or SHUTDOWN is executed
    pub async fn run(&mut self) {
        loop {
            if self.shutdown_requested {
                break;
            }

            if self.cancel.is_set() {
                self.handle_stop().await;
                continue;
            }

            // Pull in anything that arrived while executing; chains land
            // behind the current chain's remainder, never interleaved.
            while let Ok(chain) = self.chain_rx.try_recv() {
                self.enqueue(chain);
            }

            let next = match self.queue.pop() {
                Some(cmd) => cmd,
                None => {
                    self.set_phase(Phase::Idle);
                    tokio::select! {
                        chain = self.chain_rx.recv() => match chain {
                            Some(chain) => {
                                self.enqueue(chain);
                                continue;
                            }
                            None => break,
                        },
                        _ = self.cancel.triggered() => continue,
                    }
                }
            };

            self.execute_one(next).await;

            // Nothing offboard-shaped left to run; release the stream so
            // the vehicle is not held in offboard mode while idle. A
            // failed stream still needs the mode switched off.
            if (self.stream.is_active() || self.stream.has_failed())
                && !self.queue.has_offboard_work()
            {
                self.stream.stop().await;
            }
        }
        info!("Execution machine stopped");
    }

    fn enqueue(&mut self, chain: CommandChain) {
        if chain.is_empty() {
            return;
        }
        if chain.commands.iter().any(|c| c.kind == CommandKind::Stop) {
            self.cancel.trigger();
            return;
        }
        log_event(
            &self.sink,
            format!("queued chain of {} command(s)", chain.len()),
        );
        self.queue.push_chain(chain);
    }

    /// STOP: clear the queue, halt streaming, hold position, discard
    /// whatever was in flight.
    async fn handle_stop(&mut self) {
        let dropped = self.queue.clear();
        while let Ok(chain) = self.chain_rx.try_recv() {
            // Chains queued behind the STOP are superseded too
            drop(chain);
        }
        log_event(
            &self.sink,
            format!("STOP: cleared {} queued command(s)", dropped),
        );

        self.stream.stop().await;

        let snapshot = *self.vehicle.read().await;
        if snapshot.armed && snapshot.airborne {
            match supervise(OpClass::Action, &self.config.timeouts, self.control.hold()).await {
                CallOutcome::Ok(()) => {
                    self.vehicle.write().await.flight_mode = FlightMode::Hold;
                    log_event(&self.sink, "STOP: position hold engaged");
                }
                CallOutcome::TimedOut => {
                    self.state_unknown = true;
                    log_event(&self.sink, "STOP: position hold timed out");
                }
                CallOutcome::Err(e) => {
                    log_event(&self.sink, format!("STOP: position hold failed: {}", e));
                }
            }
        } else {
            log_event(&self.sink, "STOP: vehicle not airborne, nothing to hold");
        }

        self.cancel.reset();
        self.set_phase(Phase::Idle);
    }

    /// Refresh the authoritative state from telemetry. Required after
    /// any timeout before further dispatch.
    async fn refresh_state(&mut self) {
        match supervise(
            OpClass::Action,
            &self.config.timeouts,
            self.control.query_state(),
        )
        .await
        {
            CallOutcome::Ok(fresh) => {
                *self.vehicle.write().await = fresh;
                self.state_unknown = false;
            }
            CallOutcome::TimedOut => {
                warn!("State query timed out, vehicle state remains unknown");
            }
            CallOutcome::Err(FlightError::Lost) => {
                warn!("Connection lost, clearing vehicle state");
                self.vehicle.write().await.reset();
            }
            CallOutcome::Err(e) => {
                warn!("State query failed: {}", e);
            }
        }
    }

    fn precondition_failure(snapshot: &VehicleState, kind: CommandKind) -> Option<&'static str> {
        match kind {
            CommandKind::Arm => {
                if !snapshot.connected {
                    Some("not connected")
                } else if snapshot.armed {
                    Some("already armed")
                } else {
                    None
                }
            }
            CommandKind::Takeoff => {
                if !snapshot.armed {
                    Some("not armed")
                } else if snapshot.airborne {
                    Some("already airborne")
                } else {
                    None
                }
            }
            CommandKind::Move | CommandKind::Rotate => {
                if !snapshot.armed {
                    Some("not armed")
                } else if !snapshot.airborne {
                    Some("not airborne")
                } else {
                    None
                }
            }
            CommandKind::Land => {
                if !snapshot.airborne {
                    Some("not airborne")
                } else {
                    None
                }
            }
            CommandKind::Disarm => {
                if snapshot.airborne {
                    Some("airborne, land first")
                } else {
                    None
                }
            }
            CommandKind::Return => {
                if !snapshot.connected {
                    Some("not connected")
                } else {
                    None
                }
            }
            CommandKind::Stop | CommandKind::Shutdown => None,
        }
    }

    async fn execute_one(&mut self, command: AtomicCommand) {
        let started = Instant::now();

        if command.kind == CommandKind::Stop {
            self.handle_stop().await;
            return;
        }

        self.set_phase(Phase::Validating);
        if self.state_unknown {
            self.refresh_state().await;
        }
        let snapshot = *self.vehicle.read().await;

        if let Some(reason) = Self::precondition_failure(&snapshot, command.kind) {
            log_event(
                &self.sink,
                format!(
                    "precondition failed for {:?} ({}), state={:?}, raw='{}'",
                    command.kind, reason, snapshot, command.raw_text
                ),
            );
            self.finish(command, Outcome::PreconditionFailed, started);
            return;
        }
        log_event(
            &self.sink,
            format!("precondition ok for {:?}", command.kind),
        );

        self.set_phase(Phase::Dispatching);
        log_event(
            &self.sink,
            format!(
                "dispatching {:?} (recognized at {}ms)",
                command.kind, command.recognized_at_ms
            ),
        );
        self.set_phase(Phase::AwaitingResult);

        let outcome = match command.kind {
            CommandKind::Arm => self.dispatch_arm().await,
            CommandKind::Disarm => self.dispatch_disarm().await,
            CommandKind::Takeoff => self.dispatch_takeoff(&command).await,
            CommandKind::Land => self.dispatch_land().await,
            CommandKind::Return => self.dispatch_return().await,
            CommandKind::Shutdown => self.dispatch_shutdown().await,
            CommandKind::Move | CommandKind::Rotate => self.dispatch_movement(&command).await,
            CommandKind::Stop => unreachable!("handled out of band"),
        };

        if outcome == Outcome::TimedOut {
            self.state_unknown = true;
        }
        self.finish(command, outcome, started);
    }

    fn finish(&mut self, command: AtomicCommand, outcome: Outcome, started: Instant) {
        let result = ExecutionResult {
            command,
            outcome,
            elapsed: started.elapsed(),
        };
        log_event(
            &self.sink,
            format!(
                "result: {:?} outcome={:?} elapsed={:?}",
                result.command.kind, result.outcome, result.elapsed
            ),
        );
        self.set_phase(Phase::Idle);
    }

    async fn dispatch_arm(&mut self) -> Outcome {
        match supervise(OpClass::Action, &self.config.timeouts, self.control.arm()).await {
            CallOutcome::Ok(()) => {
                self.vehicle.write().await.armed = true;
                Outcome::Succeeded
            }
            CallOutcome::TimedOut => Outcome::TimedOut,
            CallOutcome::Err(e) => self.collaborator_error("ARM", e),
        }
    }

    async fn dispatch_disarm(&mut self) -> Outcome {
        self.stream.stop().await;
        match supervise(OpClass::Action, &self.config.timeouts, self.control.disarm()).await {
            CallOutcome::Ok(()) => {
                self.vehicle.write().await.armed = false;
                Outcome::Succeeded
            }
            CallOutcome::TimedOut => Outcome::TimedOut,
            CallOutcome::Err(e) => self.collaborator_error("DISARM", e),
        }
    }

    async fn dispatch_takeoff(&mut self, command: &AtomicCommand) -> Outcome {
        let altitude = command
            .magnitude
            .unwrap_or(self.config.defaults.takeoff_altitude_m);
        match supervise(
            OpClass::Action,
            &self.config.timeouts,
            self.control.takeoff(altitude),
        )
        .await
        {
            CallOutcome::Ok(()) => {
                let mut v = self.vehicle.write().await;
                v.airborne = true;
                v.flight_mode = FlightMode::Takeoff;
                Outcome::Succeeded
            }
            CallOutcome::TimedOut => Outcome::TimedOut,
            CallOutcome::Err(e) => self.collaborator_error("TAKEOFF", e),
        }
    }

    async fn dispatch_land(&mut self) -> Outcome {
        self.stream.stop().await;
        match supervise(OpClass::Action, &self.config.timeouts, self.control.land()).await {
            CallOutcome::Ok(()) => {
                let mut v = self.vehicle.write().await;
                v.airborne = false;
                v.flight_mode = FlightMode::Land;
                Outcome::Succeeded
            }
            CallOutcome::TimedOut => Outcome::TimedOut,
            CallOutcome::Err(e) => self.collaborator_error("LAND", e),
        }
    }

    async fn dispatch_return(&mut self) -> Outcome {
        self.stream.stop().await;
        match supervise(
            OpClass::Action,
            &self.config.timeouts,
            self.control.return_to_launch(),
        )
        .await
        {
            CallOutcome::Ok(()) => {
                self.vehicle.write().await.flight_mode = FlightMode::ReturnToLaunch;
                Outcome::Succeeded
            }
            CallOutcome::TimedOut => Outcome::TimedOut,
            CallOutcome::Err(e) => self.collaborator_error("RETURN", e),
        }
    }

    async fn dispatch_shutdown(&mut self) -> Outcome {
        self.stream.stop().await;
        log_event(&self.sink, "SHUTDOWN: requesting system power off");
        self.power.request_system_power_off();
        self.shutdown_requested = true;
        Outcome::Succeeded
    }

    /// Compute the new stream target for a body-frame move: rotate the
    /// direction unit vector by the current yaw so "forward" tracks the
    /// nose, then offset from the current target.
    fn move_target(current: Setpoint, direction: Direction, distance_m: f64) -> Option<Setpoint> {
        let (dx, dy, dz) = direction.ned_offset()?;
        let yaw_rad = current.yaw_deg.to_radians();
        let (sin_yaw, cos_yaw) = yaw_rad.sin_cos();

        let vx = dx * distance_m;
        let vy = dy * distance_m;
        Some(Setpoint {
            north_m: current.north_m + vx * cos_yaw - vy * sin_yaw,
            east_m: current.east_m + vx * sin_yaw + vy * cos_yaw,
            down_m: current.down_m + dz * distance_m,
            yaw_deg: current.yaw_deg,
        })
    }

    /// Movement and rotation run under the movement-class deadline,
    /// which bounds offboard establishment and settling together.
    async fn dispatch_movement(&mut self, command: &AtomicCommand) -> Outcome {
        let timeouts = self.config.timeouts.clone();
        let bounded = supervise(OpClass::Movement, &timeouts, async {
            let outcome = match command.kind {
                CommandKind::Rotate => self.dispatch_rotate(command).await,
                _ => self.dispatch_move(command).await,
            };
            Ok::<Outcome, FlightError>(outcome)
        })
        .await;
        match bounded {
            CallOutcome::Ok(outcome) => outcome,
            CallOutcome::TimedOut => Outcome::TimedOut,
            CallOutcome::Err(e) => self.collaborator_error("MOVEMENT", e),
        }
    }

    async fn dispatch_move(&mut self, command: &AtomicCommand) -> Outcome {
        if let Err(e) = self.stream.ensure_active().await {
            log_event(
                &self.sink,
                format!("OFFBOARD_FAILURE: cannot establish stream: {}", e),
            );
            return Outcome::CollaboratorError;
        }

        let direction = match command.direction {
            Some(d) => d,
            None => {
                log_event(&self.sink, "MOVE command missing direction");
                return Outcome::CollaboratorError;
            }
        };
        let distance = command.magnitude.unwrap_or(self.config.defaults.move_distance_m);

        let current = self.stream.target();
        let target = match Self::move_target(current, direction, distance) {
            Some(t) => t,
            None => {
                log_event(&self.sink, "MOVE command with rotation direction");
                return Outcome::CollaboratorError;
            }
        };
        self.stream.retarget(target);

        self.settle().await
    }

    async fn dispatch_rotate(&mut self, command: &AtomicCommand) -> Outcome {
        if let Err(e) = self.stream.ensure_active().await {
            log_event(
                &self.sink,
                format!("OFFBOARD_FAILURE: cannot establish stream: {}", e),
            );
            return Outcome::CollaboratorError;
        }

        let angle = command
            .magnitude
            .unwrap_or(self.config.defaults.rotate_angle_deg);
        let signed = match command.direction {
            Some(Direction::TurnRight) => angle,
            Some(Direction::TurnLeft) => -angle,
            _ => {
                log_event(&self.sink, "ROTATE command missing turn direction");
                return Outcome::CollaboratorError;
            }
        };

        let mut target = self.stream.target();
        target.yaw_deg += signed;
        self.stream.retarget(target);

        self.settle().await
    }

    /// Wait for the vehicle to track the new target, checking the
    /// cancel token every slice so STOP interrupts promptly.
    async fn settle(&mut self) -> Outcome {
        let slice = std::time::Duration::from_millis(100);
        let slices = (self.config.stream.settle_time.as_millis() / slice.as_millis()).max(1);
        for _ in 0..slices {
            if self.cancel.is_set() {
                log_event(&self.sink, "movement interrupted by STOP, result discarded");
                return Outcome::Interrupted;
            }
            tokio::time::sleep(slice).await;
        }
        if self.stream.has_failed() {
            log_event(&self.sink, "OFFBOARD_FAILURE: stream lapsed during movement");
            return Outcome::CollaboratorError;
        }
        Outcome::Succeeded
    }

    fn collaborator_error(&self, what: &str, e: FlightError) -> Outcome {
        log_event(&self.sink, format!("{} failed: {}", what, e));
        Outcome::CollaboratorError
    }

}

/// Terminal failsafe-reporting state: entered after connection retry
/// exhaustion. Every incoming chain is logged and dropped; nothing is
/// dispatched. The system awaits external intervention.
pub async fn run_failsafe(
    mut chain_rx: mpsc::UnboundedReceiver<CommandChain>,
    sink: Arc<dyn EventSink>,
) {
    log_event(
        &sink,
        "FAILSAFE: connection retries exhausted, commands will be reported but not executed",
    );
    while let Some(chain) = chain_rx.recv().await {
        for command in &chain.commands {
            log_event(
                &sink,
                format!(
                    "FAILSAFE: ignoring {:?} ('{}')",
                    command.kind, command.raw_text
                ),
            );
        }
    }
}
