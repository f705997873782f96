//! Staged launch vehicle simulation: fixed-step physics, scripted guidance,
//! range safety, fault injection and a lock-free state snapshot for
//! presentation layers.

pub mod config;
pub mod dynamics;
pub mod error;
pub mod gnc;
pub mod io;
pub mod orbital;
pub mod physics;
pub mod safety;
pub mod sim;
pub mod transport;
pub mod vehicle;

pub use config::SimConfig;
pub use error::{ConfigError, TransportError};
pub use sim::{EventKind, SimEvent, SimulationContext};
pub use transport::{spawn, SimHandle, Snapshot};
