pub mod attitude;
pub mod flight_computer;
pub mod pid;
pub mod presets;
pub mod script;

pub use attitude::{AttitudeController, SasMode};
pub use flight_computer::{FlightComputer, GuidanceOutput, Mode, Telemetry};
pub use pid::Pid;
pub use script::{MissionScript, ParseErrors, ScriptError, ScriptErrorKind};
