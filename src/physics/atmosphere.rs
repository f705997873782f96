// ---------------------------------------------------------------------------
// ISA 1976 Standard Atmosphere (sea level to 86 km)
// ---------------------------------------------------------------------------

const R_AIR: f64 = 287.052_87; // J/(kg·K)
const GAMMA: f64 = 1.4;

const T0: f64 = 288.15; // K
const P0: f64 = 101_325.0; // Pa

/// Air properties at a given geometric altitude.
#[derive(Debug, Clone, Copy)]
pub struct AirData {
    pub density: f64,     // kg/m^3
    pub pressure: f64,    // Pa
    pub temperature: f64, // K
    pub sound_speed: f64, // m/s
}

impl AirData {
    /// Scale density (and pressure) by an environment multiplier.
    pub fn scaled(self, multiplier: f64) -> AirData {
        let m = if multiplier.is_finite() { multiplier.max(0.0) } else { 1.0 };
        AirData { density: self.density * m, pressure: self.pressure * m, ..self }
    }
}

/// Piecewise ISA profile. Negative altitudes clamp to sea level; above
/// 86 km pressure decays exponentially toward vacuum.
pub fn isa(altitude_m: f64) -> AirData {
    let h = if altitude_m.is_finite() { altitude_m.max(0.0) } else { 0.0 };

    let (temperature, pressure) = if h < 11_000.0 {
        gradient_layer(h, 0.0, T0, -0.0065, P0)
    } else if h < 20_000.0 {
        isothermal_layer(h, 11_000.0, 216.65, 22_632.1)
    } else if h < 32_000.0 {
        gradient_layer(h, 20_000.0, 216.65, 0.001, 5_474.89)
    } else if h < 47_000.0 {
        gradient_layer(h, 32_000.0, 228.65, 0.0028, 868.019)
    } else if h < 51_000.0 {
        isothermal_layer(h, 47_000.0, 270.65, 110.906)
    } else if h < 71_000.0 {
        gradient_layer(h, 51_000.0, 270.65, -0.0028, 66.9389)
    } else if h < 86_000.0 {
        gradient_layer(h, 71_000.0, 214.65, -0.002, 3.956_42)
    } else {
        let p = 0.3734 * (-0.000_15 * (h - 86_000.0)).exp();
        (186.87, p.max(0.0))
    };

    AirData {
        density: pressure / (R_AIR * temperature),
        pressure,
        temperature,
        sound_speed: (GAMMA * R_AIR * temperature).sqrt(),
    }
}

fn gradient_layer(h: f64, h_base: f64, t_base: f64, lapse: f64, p_base: f64) -> (f64, f64) {
    let g0 = crate::dynamics::state::G0;
    let t = t_base + lapse * (h - h_base);
    let p = p_base * (t / t_base).powf(-g0 / (lapse * R_AIR));
    (t, p)
}

fn isothermal_layer(h: f64, h_base: f64, t: f64, p_base: f64) -> (f64, f64) {
    let g0 = crate::dynamics::state::G0;
    let p = p_base * (-g0 * (h - h_base) / (R_AIR * t)).exp();
    (t, p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sea_level_density() {
        let air = isa(0.0);
        assert!((air.density - 1.225).abs() < 0.01);
        assert!((air.sound_speed - 340.3).abs() < 0.5);
    }

    #[test]
    fn density_falls_with_altitude() {
        assert!(isa(10_000.0).density < isa(0.0).density);
        assert!(isa(100_000.0).density < 1e-4);
    }

    #[test]
    fn multiplier_scales_density() {
        let air = isa(0.0).scaled(0.5);
        assert!((air.density - 0.6125).abs() < 0.01);
        assert_eq!(isa(0.0).scaled(f64::NAN).density, isa(0.0).density);
    }
}
