use serde::Serialize;
use strum_macros::{Display, EnumIter};

use crate::dynamics::state::G0;
use crate::physics::thermal::ThermalSpec;

// ---------------------------------------------------------------------------
// Vessel composition
// ---------------------------------------------------------------------------

/// Composition tag of a vessel. Staging dispatches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    FullStack,
    Booster,
    UpperStage,
    Fairing,
    Payload,
}

impl Kind {
    /// Stable numeric tag used in the shared snapshot layout.
    pub fn code(self) -> u8 {
        match self {
            Kind::FullStack => 0,
            Kind::Booster => 1,
            Kind::UpperStage => 2,
            Kind::Fairing => 3,
            Kind::Payload => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Kind> {
        match code {
            0 => Some(Kind::FullStack),
            1 => Some(Kind::Booster),
            2 => Some(Kind::UpperStage),
            3 => Some(Kind::Fairing),
            4 => Some(Kind::Payload),
            _ => None,
        }
    }

    pub fn spec(self) -> VesselSpec {
        match self {
            Kind::FullStack => VesselSpecBuilder::new()
                .dry_mass(38_000.0)
                .propellant_mass(330_000.0)
                .thrust(6_200_000.0)
                .isp(285.0)
                .cd(0.45)
                .area(10.5)
                .size(3.7, 48.0)
                .max_gimbal(0.09)
                .igniters(3)
                .build(),
            Kind::Booster => VesselSpecBuilder::new()
                .dry_mass(25_000.0)
                .propellant_mass(300_000.0)
                .thrust(5_600_000.0)
                .isp(282.0)
                .cd(0.6)
                .area(10.5)
                .size(3.7, 32.0)
                .max_gimbal(0.09)
                .igniters(1)
                .build(),
            Kind::UpperStage => VesselSpecBuilder::new()
                .dry_mass(4_500.0)
                .propellant_mass(90_000.0)
                .thrust(980_000.0)
                .isp(345.0)
                .cd(0.4)
                .area(10.5)
                .size(3.7, 16.0)
                .max_gimbal(0.08)
                .igniters(3)
                .build(),
            Kind::Fairing => VesselSpecBuilder::new()
                .dry_mass(950.0)
                .propellant_mass(0.0)
                .thrust(0.0)
                .cd(1.2)
                .area(9.0)
                .size(1.8, 11.0)
                .max_gimbal(0.0)
                .igniters(0)
                .build(),
            Kind::Payload => VesselSpecBuilder::new()
                .dry_mass(3_200.0)
                .propellant_mass(600.0)
                .thrust(30_000.0)
                .isp(320.0)
                .cd(0.8)
                .area(6.0)
                .size(2.6, 4.5)
                .max_gimbal(0.1)
                .igniters(4)
                .thermal(ThermalSpec { nose_radius: 1.3, heat_capacity: 40_000.0, shield_budget: 1.5e8 })
                .build(),
        }
    }
}

// ---------------------------------------------------------------------------
// Vessel definition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VesselSpec {
    pub dry_mass: f64,        // kg
    pub propellant_mass: f64, // kg at fuel fraction 1.0
    pub thrust: f64,          // N
    pub isp: f64,             // s
    pub cd: f64,
    pub area: f64,            // m^2
    pub width: f64,           // m
    pub height: f64,          // m
    pub max_gimbal: f64,      // rad
    pub igniters: u32,
    pub thermal: ThermalSpec,
}

impl VesselSpec {
    pub fn mass_flow(&self) -> f64 {
        if self.isp > 0.0 { self.thrust / (self.isp * G0) } else { 0.0 }
    }

    /// Fuel fraction consumed per second at full throttle.
    pub fn nominal_burn_rate(&self) -> f64 {
        if self.propellant_mass > 0.0 { self.mass_flow() / self.propellant_mass } else { 0.0 }
    }

    pub fn mass(&self, fuel: f64) -> f64 {
        self.dry_mass + self.propellant_mass * fuel.clamp(0.0, 1.0)
    }

    /// Pitch moment of inertia of a uniform rod (kg·m^2).
    pub fn inertia(&self, fuel: f64) -> f64 {
        self.mass(fuel) * self.height * self.height / 12.0
    }

    pub fn has_engine(&self) -> bool {
        self.thrust > 0.0 && self.propellant_mass > 0.0
    }
}

// ---------------------------------------------------------------------------
// Spec builder
// ---------------------------------------------------------------------------

pub struct VesselSpecBuilder {
    spec: VesselSpec,
}

impl VesselSpecBuilder {
    pub fn new() -> Self {
        Self {
            spec: VesselSpec {
                dry_mass: 1_000.0,
                propellant_mass: 1_000.0,
                thrust: 30_000.0,
                isp: 250.0,
                cd: 0.5,
                area: 1.0,
                width: 1.0,
                height: 5.0,
                max_gimbal: 0.1,
                igniters: 1,
                thermal: ThermalSpec { nose_radius: 1.0, heat_capacity: 20_000.0, shield_budget: 2.0e7 },
            },
        }
    }

    pub fn dry_mass(mut self, v: f64) -> Self { self.spec.dry_mass = v; self }
    pub fn propellant_mass(mut self, v: f64) -> Self { self.spec.propellant_mass = v; self }
    pub fn thrust(mut self, v: f64) -> Self { self.spec.thrust = v; self }
    pub fn isp(mut self, v: f64) -> Self { self.spec.isp = v; self }
    pub fn cd(mut self, v: f64) -> Self { self.spec.cd = v; self }
    pub fn area(mut self, v: f64) -> Self { self.spec.area = v; self }
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.spec.width = width;
        self.spec.height = height;
        self
    }
    pub fn max_gimbal(mut self, v: f64) -> Self { self.spec.max_gimbal = v; self }
    pub fn igniters(mut self, v: u32) -> Self { self.spec.igniters = v; self }
    pub fn thermal(mut self, v: ThermalSpec) -> Self { self.spec.thermal = v; self }

    pub fn build(self) -> VesselSpec {
        self.spec
    }
}

impl Default for VesselSpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}
