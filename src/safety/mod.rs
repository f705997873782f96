pub mod faults;
pub mod fts;

pub use faults::{FaultInjector, FaultStatus, Trigger, FAULT_CATALOG};
pub use fts::{DestructOutcome, FlightTermination, FtsConfig, FtsInput, FtsState, FtsStatus, Violation};
