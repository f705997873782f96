use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dynamics::state::{PolarState, MU_PLANET, PLANET_RADIUS};
use crate::sim::integrator::rk4_polar_step;
use crate::vehicle::{Vessel, VesselId};

/// One retained sample of a predicted path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitPoint {
    pub phi: f64, // rad
    pub r: f64,   // m
}

impl From<&PolarState> for OrbitPoint {
    fn from(s: &PolarState) -> Self {
        OrbitPoint { phi: s.phi, r: s.r }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitPrediction {
    pub vessel: VesselId,
    pub computed_at: f64, // mission s
    pub points: Vec<OrbitPoint>,
    /// Integration steps actually taken.
    pub steps: usize,
    /// The path reached the surface inside the horizon.
    pub impacts: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub step: f64,           // s
    pub max_steps: usize,
    pub keep_every: usize,
    pub refresh_interval: f64, // s of mission time
    pub refresh_below: f64,    // m
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            step: 1.0,
            max_steps: 2_000,
            keep_every: 10,
            refresh_interval: 1.0,
            refresh_below: 140_000.0,
        }
    }
}

/// Points and step count for a coast from `initial`.
///
/// Integration stops at the horizon, at the surface or on a non-finite
/// state. The first and the final state are always kept.
pub fn predict(initial: &PolarState, config: &PredictorConfig) -> (Vec<OrbitPoint>, usize, bool) {
    let keep_every = config.keep_every.max(1);
    let mut points = vec![OrbitPoint::from(initial)];
    let mut state = *initial;
    let mut last_kept = 0;
    let mut steps = 0;
    let mut impacts = false;

    while steps < config.max_steps {
        let next = rk4_polar_step(&state, MU_PLANET, config.step);
        if !next.is_finite() || next == state {
            break;
        }
        state = next;
        steps += 1;
        if state.r <= PLANET_RADIUS {
            impacts = true;
            break;
        }
        if steps % keep_every == 0 {
            points.push(OrbitPoint::from(&state));
            last_kept = steps;
        }
    }
    if last_kept != steps {
        points.push(OrbitPoint::from(&state));
    }
    (points, steps, impacts)
}

// ---------------------------------------------------------------------------
// Per-vessel cache
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct OrbitPredictor {
    pub config: PredictorConfig,
    predictions: HashMap<VesselId, OrbitPrediction>,
}

impl OrbitPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config, predictions: HashMap::new() }
    }

    fn is_stale(&self, vessel: &Vessel, mission_time: f64) -> bool {
        match self.predictions.get(&vessel.id) {
            None => true,
            Some(prev) => {
                vessel.is_thrusting()
                    || vessel.altitude() < self.config.refresh_below
                    || mission_time - prev.computed_at > self.config.refresh_interval
            }
        }
    }

    /// Recompute the vessel's path if it is stale. Returns `true` when a new
    /// prediction replaced the old one.
    pub fn refresh(&mut self, vessel: &Vessel, mission_time: f64) -> bool {
        if !self.is_stale(vessel, mission_time) {
            return false;
        }
        let (points, steps, impacts) = predict(&vessel.polar_state(), &self.config);
        self.predictions.insert(
            vessel.id,
            OrbitPrediction { vessel: vessel.id, computed_at: mission_time, points, steps, impacts },
        );
        true
    }

    pub fn get(&self, id: VesselId) -> Option<&OrbitPrediction> {
        self.predictions.get(&id)
    }

    /// Drop predictions for vessels that no longer exist.
    pub fn retain(&mut self, live: impl Fn(VesselId) -> bool) {
        self.predictions.retain(|id, _| live(*id));
    }

    pub fn clear(&mut self) {
        self.predictions.clear();
    }
}
