//! Simulation configuration with TOML overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::orbital::PredictorConfig;
use crate::physics::EnvironmentConfig;
use crate::safety::FtsConfig;

/// Which clock debounces staging requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CooldownClock {
    /// Real time, so two requests in one burst of ticks collapse into one.
    #[default]
    Wall,
    /// Mission time, for headless runs faster than real time.
    Mission,
}

/// Launch vehicle set-up on the pad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub launch_heading: f64, // rad from vertical
    pub initial_fuel: f64,   // fraction
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self { launch_heading: 0.0, initial_fuel: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub fixed_dt: f64,         // s
    pub max_frame_time: f64,   // s
    pub max_time_scale: f64,
    pub staging_cooldown: f64, // s
    pub cooldown_clock: CooldownClock,
    pub width: f64,            // m, launch strip
    pub ground_y: f64,         // m, presentation y of the ground line
    pub command_capacity: usize,
    pub event_capacity: usize,
    pub region_capacity: usize, // vessel records
    pub fts: FtsConfig,
    pub predictor: PredictorConfig,
    pub environment: EnvironmentConfig,
    pub vehicle: VehicleConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 0.02,
            max_frame_time: 0.25,
            max_time_scale: 50.0,
            staging_cooldown: 1.0,
            cooldown_clock: CooldownClock::Wall,
            width: 2_000.0,
            ground_y: 1_000.0,
            command_capacity: 64,
            event_capacity: 256,
            region_capacity: 32,
            fts: FtsConfig::default(),
            predictor: PredictorConfig::default(),
            environment: EnvironmentConfig::default(),
            vehicle: VehicleConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load overrides from a TOML file. Missing keys keep their defaults.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_dt > 0.0) || !self.fixed_dt.is_finite() {
            return Err(ConfigError::Invalid(format!("fixed_dt must be positive, got {}", self.fixed_dt)));
        }
        if !(self.max_frame_time >= self.fixed_dt) {
            return Err(ConfigError::Invalid("max_frame_time must be at least fixed_dt".into()));
        }
        if !(self.max_time_scale >= 0.0) {
            return Err(ConfigError::Invalid("max_time_scale must not be negative".into()));
        }
        if self.command_capacity == 0 || self.event_capacity == 0 {
            return Err(ConfigError::Invalid("channel capacities must be non-zero".into()));
        }
        Ok(())
    }
}
