use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665;
pub const PLANET_RADIUS: f64 = 6_371_000.0;
/// Gravitational parameter consistent with `G0` at the surface.
pub const MU_PLANET: f64 = G0 * PLANET_RADIUS * PLANET_RADIUS;

// ---------------------------------------------------------------------------
// Manual control input (one step request)
// ---------------------------------------------------------------------------

/// Control payload carried by a step request from the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    pub throttle: f64,     // absolute throttle request, 0..1
    pub gimbal_angle: f64, // steering input, rad (0 = no input)
    pub stage: bool,
    pub abort: bool,
    pub ignition: bool,
    pub cutoff: bool,
}

// ---------------------------------------------------------------------------
// Resolved per-vessel control set
// ---------------------------------------------------------------------------

/// Control set handed to a vessel's physics advance after manual input,
/// autopilot and fault overrides have been resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlSet {
    pub throttle: f64,
    pub gimbal: f64,
    pub ignition: bool,
    pub cutoff: bool,
}

// ---------------------------------------------------------------------------
// Polar two-body state (orbit prediction)
// ---------------------------------------------------------------------------

/// Planar two-body state about the planet centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarState {
    pub r: f64,     // m, from planet centre
    pub phi: f64,   // rad
    pub v_r: f64,   // m/s, radial
    pub v_phi: f64, // m/s, tangential
}

impl PolarState {
    pub fn apply(&self, d: &PolarDeriv, dt: f64) -> PolarState {
        PolarState {
            r: self.r + d.dr * dt,
            phi: self.phi + d.dphi * dt,
            v_r: self.v_r + d.dv_r * dt,
            v_phi: self.v_phi + d.dv_phi * dt,
        }
    }

    pub fn altitude(&self) -> f64 {
        self.r - PLANET_RADIUS
    }

    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.phi.is_finite() && self.v_r.is_finite() && self.v_phi.is_finite()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PolarDeriv {
    pub dr: f64,
    pub dphi: f64,
    pub dv_r: f64,
    pub dv_phi: f64,
}
