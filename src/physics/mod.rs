pub mod aerodynamics;
pub mod atmosphere;
pub mod environment;
pub mod gravity;
pub mod thermal;

pub use environment::{Environment, EnvironmentConfig};
