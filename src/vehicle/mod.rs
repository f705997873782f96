pub mod reliability;
pub mod stage;
pub mod vessel;

pub use reliability::{FailureType, Reliability};
pub use stage::{Kind, VesselSpec, VesselSpecBuilder};
pub use vessel::{EngineState, Vessel, VesselId, VesselTelemetry};
