//! Command data model: atomic commands, chains, and execution results.

use std::time::Duration;

/// What a single parsed command asks the vehicle to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Arm,
    Disarm,
    Takeoff,
    Land,
    Move,
    Rotate,
    Stop,
    Return,
    Shutdown,
}

impl CommandKind {
    /// Commands that require an active offboard setpoint stream
    pub fn needs_offboard(&self) -> bool {
        matches!(self, CommandKind::Move | CommandKind::Rotate)
    }
}

/// Movement or rotation direction attached to MOVE/ROTATE commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
    TurnLeft,
    TurnRight,
}

impl Direction {
    /// Unit offset in the NED frame, relative to the vehicle nose.
    /// Up is negative Z in NED.
    pub fn ned_offset(&self) -> Option<(f64, f64, f64)> {
        match self {
            Direction::Forward => Some((1.0, 0.0, 0.0)),
            Direction::Backward => Some((-1.0, 0.0, 0.0)),
            Direction::Left => Some((0.0, -1.0, 0.0)),
            Direction::Right => Some((0.0, 1.0, 0.0)),
            Direction::Up => Some((0.0, 0.0, -1.0)),
            Direction::Down => Some((0.0, 0.0, 1.0)),
            Direction::TurnLeft | Direction::TurnRight => None,
        }
    }
}

/// One validated command awaiting dispatch.
///
/// `magnitude` is always in canonical units (meters or degrees) by the
/// time the command leaves the parser; raw unit/value pairs never reach
/// the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicCommand {
    pub kind: CommandKind,
    pub direction: Option<Direction>,
    pub magnitude: Option<f64>,
    pub raw_text: String,
    pub recognized_at_ms: u64,
}

/// Ordered sequence of atomic commands from one utterance.
/// Insertion order is execution order; at most one chain is active.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandChain {
    pub commands: Vec<AtomicCommand>,
}

impl CommandChain {
    pub fn new(commands: Vec<AtomicCommand>) -> Self {
        Self { commands }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

/// Final disposition of one dispatched command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Superseded by STOP mid-execution; the result is discarded
    Interrupted,
    PreconditionFailed,
    TimedOut,
    CollaboratorError,
}

/// Created at dispatch, consumed immediately by logging, not retained
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub command: AtomicCommand,
    pub outcome: Outcome,
    pub elapsed: Duration,
}
