//! Flight-control collaborator: trait boundary, timeout supervision,
//! connection establishment, and the simulated vehicle backend.

pub mod connect;
pub mod sim;
pub mod supervisor;
pub mod traits;

pub use connect::connect_with_retry;
pub use sim::SimFlightControl;
pub use supervisor::{supervise, OpClass};
pub use traits::{FlightConnector, FlightControl, PowerHook};
