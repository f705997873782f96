pub mod state;

pub use state::{ControlSet, Controls, PolarDeriv, PolarState, G0, MU_PLANET, PLANET_RADIUS};
