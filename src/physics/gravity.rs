use crate::dynamics::state::{G0, PLANET_RADIUS};

/// Inverse-square gravity magnitude at a given altitude (m/s^2).
pub fn gravity_accel(altitude: f64) -> f64 {
    let alt = altitude.max(0.0);
    G0 * (PLANET_RADIUS / (PLANET_RADIUS + alt)).powi(2)
}

/// Apparent upward acceleration from horizontal motion over the curved
/// surface. Lets the flat strip model sustain orbits.
pub fn centrifugal_accel(horizontal_speed: f64, altitude: f64) -> f64 {
    let r = PLANET_RADIUS + altitude.max(0.0);
    horizontal_speed * horizontal_speed / r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::MU_PLANET;

    #[test]
    fn sea_level_gravity() {
        assert!((gravity_accel(0.0) - G0).abs() < 1e-9);
    }

    #[test]
    fn gravity_decreases_with_altitude() {
        assert!(gravity_accel(100_000.0) < gravity_accel(0.0));
    }

    #[test]
    fn circular_speed_balances_gravity() {
        let alt = 200_000.0;
        let v = (MU_PLANET / (PLANET_RADIUS + alt)).sqrt();
        let net = centrifugal_accel(v, alt) - gravity_accel(alt);
        assert!(net.abs() < 1e-6, "net vertical accel {net}");
    }
}
