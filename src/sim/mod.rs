pub mod clock;
pub mod event;
pub mod integrator;
pub mod scheduler;
pub mod staging;

pub use clock::{FixedTimestep, ManualClock, SystemClock, WallClock};
pub use event::{EventKind, SimEvent};
pub use integrator::rk4_polar_step;
pub use scheduler::{SimulationContext, TickReport};
pub use staging::{stage, IdAllocator, Separation};
