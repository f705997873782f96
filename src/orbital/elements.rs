use crate::dynamics::state::{PolarState, MU_PLANET, PLANET_RADIUS};

/// Planar conic elements derived from a polar state vector.
#[derive(Debug, Clone, Copy)]
pub struct ConicElements {
    pub sma: f64,    // semi-major axis, m (negative for hyperbolic)
    pub ecc: f64,    // eccentricity
    pub energy: f64, // specific orbital energy, J/kg
    pub h: f64,      // specific angular momentum, m^2/s
}

impl ConicElements {
    pub fn from_polar(state: &PolarState) -> Self {
        Self::from_polar_mu(state, MU_PLANET)
    }

    pub fn from_polar_mu(state: &PolarState, mu: f64) -> Self {
        let r = state.r.max(1.0);
        let v2 = state.v_r * state.v_r + state.v_phi * state.v_phi;
        let energy = 0.5 * v2 - mu / r;
        let h = r * state.v_phi;
        let ecc = (1.0 + 2.0 * energy * h * h / (mu * mu)).max(0.0).sqrt();
        let sma = if energy.abs() > 1e-12 { -mu / (2.0 * energy) } else { f64::INFINITY };
        ConicElements { sma, ecc, energy, h }
    }

    pub fn is_bound(&self) -> bool {
        self.energy < 0.0 && self.ecc < 1.0 + 1e-12
    }

    /// Apoapsis radius, `None` for escape trajectories.
    pub fn apoapsis(&self) -> Option<f64> {
        self.is_bound().then(|| self.sma * (1.0 + self.ecc))
    }

    pub fn periapsis(&self) -> f64 {
        self.sma * (1.0 - self.ecc)
    }

    pub fn apoapsis_altitude(&self) -> Option<f64> {
        self.apoapsis().map(|ra| ra - PLANET_RADIUS)
    }

    pub fn periapsis_altitude(&self) -> f64 {
        self.periapsis() - PLANET_RADIUS
    }

    /// Orbital period for a bound orbit (s).
    pub fn period(&self) -> Option<f64> {
        self.is_bound()
            .then(|| 2.0 * std::f64::consts::PI * (self.sma.powi(3) / MU_PLANET).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_orbit_apsides_match() {
        let r = PLANET_RADIUS + 300_000.0;
        let s = PolarState { r, phi: 0.0, v_r: 0.0, v_phi: (MU_PLANET / r).sqrt() };
        let el = ConicElements::from_polar(&s);
        assert!(el.ecc < 1e-9);
        assert!((el.apoapsis_altitude().unwrap() - 300_000.0).abs() < 1.0);
        assert!((el.periapsis_altitude() - 300_000.0).abs() < 1.0);
    }

    #[test]
    fn vertical_shot_apoapsis() {
        // Straight up at 1 km/s from the surface: h = 0, e = 1.
        let s = PolarState { r: PLANET_RADIUS, phi: 0.0, v_r: 1_000.0, v_phi: 0.0 };
        let el = ConicElements::from_polar(&s);
        let expected = 1_000.0_f64.powi(2) / (2.0 * 9.80665); // flat-gravity estimate
        let apo = el.apoapsis_altitude().unwrap();
        assert!(apo > expected && apo < expected * 1.05, "apoapsis {apo}");
    }

    #[test]
    fn escape_has_no_apoapsis() {
        let s = PolarState { r: PLANET_RADIUS, phi: 0.0, v_r: 0.0, v_phi: 12_000.0 };
        assert!(ConicElements::from_polar(&s).apoapsis().is_none());
    }

    #[test]
    fn leo_period() {
        let r = PLANET_RADIUS + 400_000.0;
        let s = PolarState { r, phi: 0.0, v_r: 0.0, v_phi: (MU_PLANET / r).sqrt() };
        let period = ConicElements::from_polar(&s).period().unwrap();
        assert!(period > 5_400.0 && period < 5_700.0, "period {period}");
    }
}
