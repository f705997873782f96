// ---------------------------------------------------------------------------
// Lumped skin heating with an ablative heat shield
// ---------------------------------------------------------------------------

const SUTTON_GRAVES_K: f64 = 1.7415e-4; // Earth air, SI units
const STEFAN_BOLTZMANN: f64 = 5.670_374e-8;
const EMISSIVITY: f64 = 0.8;
const AMBIENT_TEMP: f64 = 288.15; // K

/// Skin temperature at which the shield starts ablating (K).
pub const ABLATION_TEMP: f64 = 1_600.0;
/// Skin temperature that destroys an unshielded structure (K).
pub const FAILURE_TEMP: f64 = 2_400.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalState {
    pub skin_temp: f64,     // K
    pub shield: f64,        // remaining heat-shield fraction, 0..1
    pub ablating: bool,
}

impl Default for ThermalState {
    fn default() -> Self {
        Self { skin_temp: AMBIENT_TEMP, shield: 1.0, ablating: false }
    }
}

/// Per-vessel thermal properties.
#[derive(Debug, Clone, Copy)]
pub struct ThermalSpec {
    pub nose_radius: f64,   // m
    pub heat_capacity: f64, // J/K per m^2 of skin
    pub shield_budget: f64, // J/m^2 the shield can absorb
}

/// Stagnation-point convective heat flux (W/m^2), Sutton–Graves.
pub fn stagnation_heat_flux(density: f64, speed: f64, nose_radius: f64) -> f64 {
    if density <= 0.0 || nose_radius <= 0.0 {
        return 0.0;
    }
    SUTTON_GRAVES_K * (density / nose_radius).sqrt() * speed.abs().powi(3)
}

impl ThermalState {
    /// Advance the skin temperature. Returns `true` when the structure
    /// exceeded its failure temperature with no shield left.
    pub fn update(&mut self, spec: &ThermalSpec, density: f64, speed: f64, dt: f64) -> bool {
        if !(dt > 0.0) {
            return false;
        }
        let q_in = stagnation_heat_flux(density, speed, spec.nose_radius);
        let q_out = EMISSIVITY
            * STEFAN_BOLTZMANN
            * (self.skin_temp.powi(4) - AMBIENT_TEMP.powi(4)).max(0.0);
        let mut net = q_in - q_out;

        self.ablating = self.skin_temp >= ABLATION_TEMP && self.shield > 0.0 && net > 0.0;
        if self.ablating {
            let absorbed = net * dt;
            self.shield = (self.shield - absorbed / spec.shield_budget).max(0.0);
            net = 0.0;
        }

        let heat_capacity = spec.heat_capacity.max(1.0);
        self.skin_temp = (self.skin_temp + net * dt / heat_capacity).max(AMBIENT_TEMP);
        self.shield <= 0.0 && self.skin_temp >= FAILURE_TEMP
    }
}
