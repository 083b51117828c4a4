//! Plant monitoring node: samples soil, light and climate sensors on
//! independent timers and mirrors the readings into a remote document store.

pub mod activity;
pub mod calibration;
pub mod clock;
pub mod config;
pub mod memory;
pub mod node;
pub mod path;
pub mod remote;
pub mod repair;
pub mod rest;
pub mod sampling;
pub mod scheduler;
pub mod sensors;
#[cfg(feature = "sim")]
pub mod sim;
pub mod snapshot;
pub mod state;
pub mod sync;
pub mod ticker;

#[cfg(test)]
mod testing;

pub use calibration::Calibration;
pub use clock::{Clock, ManualClock, SystemClock};
pub use node::{Node, NodeSettings, TaskKind};
pub use path::RecordPath;
pub use remote::{RemoteError, RemoteStore};
pub use sensors::{SensorError, SensorSource};
pub use state::{SensorState, Telemetry};
