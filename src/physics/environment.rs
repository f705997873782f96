use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Wind and density perturbation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub wind_x: f64,            // m/s, steady
    pub wind_y: f64,            // m/s, steady (up positive)
    pub gust_amplitude: f64,    // m/s
    pub gust_period: f64,       // s
    pub density_multiplier: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            wind_x: 4.0,
            wind_y: 0.0,
            gust_amplitude: 2.0,
            gust_period: 12.0,
            density_multiplier: 1.0,
        }
    }
}

/// Environment scalars for the current tick. Deterministic in mission time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub wind: Vector2<f64>,
    pub density_multiplier: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self { wind: Vector2::zeros(), density_multiplier: 1.0 }
    }
}

impl Environment {
    pub fn at(config: &EnvironmentConfig, mission_time: f64) -> Environment {
        let gust = if config.gust_period > 0.0 {
            config.gust_amplitude
                * (2.0 * std::f64::consts::PI * mission_time / config.gust_period).sin()
        } else {
            0.0
        };
        Environment {
            wind: Vector2::new(config.wind_x + gust, config.wind_y),
            density_multiplier: config.density_multiplier.max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gust_oscillates_around_steady_wind() {
        let cfg = EnvironmentConfig::default();
        let quarter = Environment::at(&cfg, cfg.gust_period / 4.0);
        let three_quarter = Environment::at(&cfg, cfg.gust_period * 0.75);
        assert!((quarter.wind.x - (cfg.wind_x + cfg.gust_amplitude)).abs() < 1e-9);
        assert!((three_quarter.wind.x - (cfg.wind_x - cfg.gust_amplitude)).abs() < 1e-9);
    }

    #[test]
    fn zero_period_disables_gusts() {
        let cfg = EnvironmentConfig { gust_period: 0.0, ..Default::default() };
        assert_eq!(Environment::at(&cfg, 3.0).wind.x, cfg.wind_x);
    }
}
