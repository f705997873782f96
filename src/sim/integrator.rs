use crate::dynamics::state::{PolarDeriv, PolarState};

// ---------------------------------------------------------------------------
// Two-body equations of motion in polar coordinates
// ---------------------------------------------------------------------------

/// Point-mass gravity in the orbital plane:
///   r'     = v_r
///   phi'   = v_phi / r
///   v_r'   = v_phi^2 / r - mu / r^2
///   v_phi' = -v_r * v_phi / r
pub fn derivatives(state: &PolarState, mu: f64) -> PolarDeriv {
    let r = state.r;
    if r < 1.0 || !r.is_finite() {
        return PolarDeriv::default();
    }
    PolarDeriv {
        dr: state.v_r,
        dphi: state.v_phi / r,
        dv_r: state.v_phi * state.v_phi / r - mu / (r * r),
        dv_phi: -state.v_r * state.v_phi / r,
    }
}

// ---------------------------------------------------------------------------
// Classical RK4
// ---------------------------------------------------------------------------

/// Single RK4 step. A zero, negative or non-finite `dt` returns the state
/// unchanged.
pub fn rk4_polar_step(state: &PolarState, mu: f64, dt: f64) -> PolarState {
    if !(dt > 0.0) || !dt.is_finite() {
        return *state;
    }
    let k1 = derivatives(state, mu);
    let k2 = derivatives(&state.apply(&k1, dt * 0.5), mu);
    let k3 = derivatives(&state.apply(&k2, dt * 0.5), mu);
    let k4 = derivatives(&state.apply(&k3, dt), mu);

    PolarState {
        r: state.r + (k1.dr + 2.0 * k2.dr + 2.0 * k3.dr + k4.dr) * (dt / 6.0),
        phi: state.phi + (k1.dphi + 2.0 * k2.dphi + 2.0 * k3.dphi + k4.dphi) * (dt / 6.0),
        v_r: state.v_r + (k1.dv_r + 2.0 * k2.dv_r + 2.0 * k3.dv_r + k4.dv_r) * (dt / 6.0),
        v_phi: state.v_phi
            + (k1.dv_phi + 2.0 * k2.dv_phi + 2.0 * k3.dv_phi + k4.dv_phi) * (dt / 6.0),
    }
}
