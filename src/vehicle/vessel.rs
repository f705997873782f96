use nalgebra::Vector2;
use serde::Serialize;
use strum_macros::Display;

use crate::dynamics::state::{ControlSet, PolarState, PLANET_RADIUS};
use crate::orbital::elements::ConicElements;
use crate::physics::aerodynamics::{damping_accel, drag_force, dynamic_pressure};
use crate::physics::atmosphere::{self, AirData};
use crate::physics::environment::Environment;
use crate::physics::gravity::{centrifugal_accel, gravity_accel};
use crate::physics::thermal::ThermalState;

use super::reliability::{FailureType, Reliability};
use super::stage::{Kind, VesselSpec};

/// Engine spool-up time from ignition to full thrust (s).
pub const SPOOL_TIME: f64 = 0.5;
/// Touchdown speed above which ground contact destroys the vessel (m/s).
pub const CRASH_SPEED: f64 = 12.0;

const SENSOR_GLITCH_AMPLITUDE: f64 = 400.0; // m

/// Identity of a vessel. Never reused within one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VesselId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    Off,
    Starting,
    Running,
    Flameout,
}

impl EngineState {
    pub fn code(self) -> u8 {
        match self {
            EngineState::Off => 0,
            EngineState::Starting => 1,
            EngineState::Running => 2,
            EngineState::Flameout => 3,
        }
    }
}

/// Quantities derived from the kinematic state after each advance.
#[derive(Debug, Clone, Copy, Default)]
pub struct VesselTelemetry {
    pub altitude: f64,
    pub speed: f64,
    pub dynamic_pressure: f64,
    pub mach: f64,
    pub apogee: f64,
}

// ---------------------------------------------------------------------------
// Vessel entity
// ---------------------------------------------------------------------------

/// A simulated vessel.
///
/// Position is in presentation coordinates (`x` right, `y` down, ground at
/// `ground_y`); velocity is in the flight frame (`vx` right, `vy` up).
/// `angle` is the heading from vertical, positive toward +x.
#[derive(Debug, Clone)]
pub struct Vessel {
    pub id: VesselId,
    pub kind: Kind,
    pub spec: VesselSpec,
    pub pos: Vector2<f64>,
    pub vel: Vector2<f64>,
    pub angle: f64,
    pub angular_rate: f64,
    pub fuel: f64,
    pub throttle: f64,
    pub gimbal: f64,
    pub engine: EngineState,
    pub igniters: u32,
    pub active: bool,
    pub crashed: bool,
    pub on_ground: bool,
    pub fairings_deployed: bool,
    pub thermal: ThermalState,
    pub reliability: Reliability,
    pub telemetry: VesselTelemetry,
    ground_y: f64,
    spool: f64,
    glitch_phase: f64,
}

impl Vessel {
    pub fn new(id: VesselId, kind: Kind, pos: Vector2<f64>, ground_y: f64) -> Self {
        let spec = kind.spec();
        let mut vessel = Self {
            id,
            kind,
            igniters: spec.igniters,
            spec,
            pos,
            vel: Vector2::zeros(),
            angle: 0.0,
            angular_rate: 0.0,
            fuel: 1.0,
            throttle: 0.0,
            gimbal: 0.0,
            engine: EngineState::Off,
            active: true,
            crashed: false,
            on_ground: false,
            fairings_deployed: false,
            thermal: ThermalState::default(),
            reliability: Reliability::default(),
            telemetry: VesselTelemetry::default(),
            ground_y,
            spool: 0.0,
            glitch_phase: 0.0,
        };
        vessel.on_ground = vessel.altitude() <= 0.5;
        vessel.refresh_telemetry(&atmosphere::isa(vessel.altitude()));
        vessel
    }

    pub fn altitude(&self) -> f64 {
        self.ground_y - self.pos.y
    }

    pub fn ground_y(&self) -> f64 {
        self.ground_y
    }

    pub fn mass(&self) -> f64 {
        self.spec.mass(self.fuel)
    }

    pub fn is_thrusting(&self) -> bool {
        self.thrust_fraction() > 0.0
    }

    /// Altitude as reported by the avionics (biased by a sensor glitch).
    pub fn sensed_altitude(&self) -> f64 {
        if self.reliability.has(FailureType::SensorGlitch) {
            self.altitude() + SENSOR_GLITCH_AMPLITUDE * (self.glitch_phase * 2.1).sin()
        } else {
            self.altitude()
        }
    }

    /// Angle between the velocity vector and local vertical (rad, 0..pi).
    pub fn flight_path_angle(&self) -> f64 {
        let speed = self.vel.norm();
        if speed < 1e-6 {
            return 0.0;
        }
        (self.vel.y / speed).clamp(-1.0, 1.0).acos()
    }

    /// Map the flat strip onto a polar state about the planet centre.
    pub fn polar_state(&self) -> PolarState {
        PolarState {
            r: PLANET_RADIUS + self.altitude().max(0.0),
            phi: self.pos.x / PLANET_RADIUS,
            v_r: self.vel.y,
            v_phi: self.vel.x,
        }
    }

    /// Controls that keep the vessel doing what it is already doing.
    pub fn hold_controls(&self) -> ControlSet {
        ControlSet { throttle: self.throttle, gimbal: self.gimbal, ignition: false, cutoff: false }
    }

    pub fn trigger_failure(&mut self, failure: FailureType) {
        if !self.reliability.trigger(failure) {
            return;
        }
        match failure {
            FailureType::EngineFlameout => {
                if matches!(self.engine, EngineState::Starting | EngineState::Running) {
                    self.engine = EngineState::Flameout;
                }
            }
            FailureType::StructuralFailure => {
                self.explode();
            }
            _ => {}
        }
    }

    /// Destroy the vessel. Returns `true` only on the first call.
    pub fn explode(&mut self) -> bool {
        if self.crashed {
            return false;
        }
        self.crashed = true;
        self.active = false;
        self.engine = EngineState::Off;
        self.throttle = 0.0;
        true
    }

    fn thrust_fraction(&self) -> f64 {
        match self.engine {
            EngineState::Running => self.throttle,
            EngineState::Starting => self.throttle * (self.spool / SPOOL_TIME).min(1.0),
            EngineState::Off | EngineState::Flameout => 0.0,
        }
    }

    fn update_engine(&mut self, controls: &ControlSet, dt: f64) {
        if !self.spec.has_engine() {
            self.engine = EngineState::Off;
            return;
        }
        if controls.cutoff && matches!(self.engine, EngineState::Starting | EngineState::Running) {
            self.engine = EngineState::Off;
        }
        if controls.ignition
            && matches!(self.engine, EngineState::Off | EngineState::Flameout)
            && self.igniters > 0
        {
            self.igniters -= 1;
            let healthy = !self.reliability.has(FailureType::IgnitionFailure)
                && !self.reliability.has(FailureType::EngineFlameout);
            if healthy && self.fuel > 0.0 {
                self.engine = EngineState::Starting;
                self.spool = 0.0;
            }
        }
        if self.engine == EngineState::Starting {
            self.spool += dt;
            if self.spool >= SPOOL_TIME {
                self.engine = EngineState::Running;
            }
        }
        let starved = self.fuel <= 0.0 || self.reliability.has(FailureType::EngineFlameout);
        if starved && matches!(self.engine, EngineState::Starting | EngineState::Running) {
            self.engine = EngineState::Flameout;
        }
    }

    // -----------------------------------------------------------------------
    // Physics advance
    // -----------------------------------------------------------------------

    /// Advance the vessel by `dt` under the resolved control set.
    ///
    /// Forces: thrust along the heading, inverse-square gravity with the
    /// curvature (centrifugal) term, drag against the air-relative velocity.
    /// Inactive or destroyed vessels and non-positive `dt` are left untouched.
    pub fn advance(&mut self, dt: f64, controls: &ControlSet, env: &Environment) {
        if !self.active || self.crashed || !(dt > 0.0) || !dt.is_finite() {
            return;
        }

        if controls.throttle.is_finite() {
            self.throttle = controls.throttle.clamp(0.0, 1.0);
        }
        if !self.reliability.has(FailureType::GimbalLock) && controls.gimbal.is_finite() {
            let max = self.spec.max_gimbal;
            self.gimbal = controls.gimbal.clamp(-max, max);
        }
        self.update_engine(controls, dt);
        self.glitch_phase += dt;

        let alt = self.altitude().max(0.0);
        let air = atmosphere::isa(alt).scaled(env.density_multiplier);
        let mass = self.mass();

        // --- Thrust ---
        let thrust = self.spec.thrust * self.thrust_fraction();
        let heading = Vector2::new(self.angle.sin(), self.angle.cos());
        let a_thrust = heading * (thrust / mass);

        // --- Gravity + curvature ---
        let a_gravity = Vector2::new(0.0, centrifugal_accel(self.vel.x, alt) - gravity_accel(alt));

        // --- Drag ---
        let rel_vel = self.vel - env.wind;
        let a_drag = drag_force(&rel_vel, &air, self.spec.cd, self.spec.area) / mass;

        // --- Rotation ---
        let inertia = self.spec.inertia(self.fuel);
        let q_dyn = dynamic_pressure(&air, rel_vel.norm());
        let torque_accel = if inertia > 0.0 {
            thrust * self.gimbal.sin() * (self.spec.height * 0.5) / inertia
        } else {
            0.0
        };
        let alpha = torque_accel + damping_accel(self.angular_rate, q_dyn, self.spec.area, inertia);

        // --- Propellant ---
        if thrust > 0.0 {
            let burn = self.spec.nominal_burn_rate() * self.thrust_fraction() * dt;
            self.fuel = (self.fuel - burn).max(0.0);
        }

        // Semi-implicit Euler
        let accel = a_thrust + a_gravity + a_drag;
        self.vel += accel * dt;
        self.pos.x += self.vel.x * dt;
        self.pos.y -= self.vel.y * dt;
        self.angular_rate += alpha * dt;
        self.angle += self.angular_rate * dt;

        self.resolve_ground_contact();
        if self.crashed {
            return;
        }

        if self.thermal.update(&self.spec.thermal, air.density, rel_vel.norm(), dt) {
            self.explode();
            return;
        }

        self.refresh_telemetry(&air);
    }

    fn resolve_ground_contact(&mut self) {
        if self.altitude() > 0.0 {
            self.on_ground = false;
            return;
        }
        self.pos.y = self.ground_y;
        if self.vel.y <= 0.0 {
            let impact = self.vel.norm();
            self.vel = Vector2::zeros();
            if impact > CRASH_SPEED && !self.on_ground {
                self.explode();
                return;
            }
        }
        self.angular_rate = 0.0;
        self.on_ground = true;
    }

    fn refresh_telemetry(&mut self, air: &AirData) {
        let altitude = self.altitude();
        let speed = self.vel.norm();
        let apogee = ConicElements::from_polar(&self.polar_state())
            .apoapsis_altitude()
            .unwrap_or(f64::INFINITY)
            .max(altitude);
        self.telemetry = VesselTelemetry {
            altitude,
            speed,
            dynamic_pressure: dynamic_pressure(air, speed),
            mach: if air.sound_speed > 0.0 { speed / air.sound_speed } else { 0.0 },
            apogee,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUND: f64 = 1_000.0;

    fn on_pad(kind: Kind) -> Vessel {
        Vessel::new(VesselId(1), kind, Vector2::new(0.0, GROUND), GROUND)
    }

    fn ignite() -> ControlSet {
        ControlSet { throttle: 1.0, gimbal: 0.0, ignition: true, cutoff: false }
    }

    fn full() -> ControlSet {
        ControlSet { throttle: 1.0, ..Default::default() }
    }

    #[test]
    fn stays_on_pad_without_ignition() {
        let mut v = on_pad(Kind::FullStack);
        let env = Environment::default();
        for _ in 0..100 {
            v.advance(0.02, &full(), &env);
        }
        assert!(v.altitude().abs() < 1e-9);
        assert!(!v.crashed);
        assert_eq!(v.engine, EngineState::Off);
    }

    #[test]
    fn ignition_spools_up_and_lifts_off() {
        let mut v = on_pad(Kind::FullStack);
        let env = Environment::default();
        v.advance(0.02, &ignite(), &env);
        assert_eq!(v.engine, EngineState::Starting);
        assert_eq!(v.igniters, v.spec.igniters - 1);
        for _ in 0..500 {
            v.advance(0.02, &full(), &env);
        }
        assert_eq!(v.engine, EngineState::Running);
        assert!(v.altitude() > 100.0, "altitude {}", v.altitude());
        assert!(v.fuel < 1.0);
    }

    #[test]
    fn ignition_failure_burns_igniter() {
        let mut v = on_pad(Kind::FullStack);
        v.trigger_failure(FailureType::IgnitionFailure);
        v.advance(0.02, &ignite(), &Environment::default());
        assert_eq!(v.engine, EngineState::Off);
        assert_eq!(v.igniters, v.spec.igniters - 1);
    }

    #[test]
    fn fast_ground_impact_destroys() {
        let mut v = on_pad(Kind::Payload);
        v.pos.y -= 50.0;
        v.on_ground = false;
        v.vel = Vector2::new(0.0, -80.0);
        let env = Environment::default();
        for _ in 0..100 {
            v.advance(0.02, &ControlSet::default(), &env);
        }
        assert!(v.crashed);
        assert!(!v.active);
    }

    #[test]
    fn explode_fires_once() {
        let mut v = on_pad(Kind::Booster);
        assert!(v.explode());
        assert!(!v.explode());
    }

    #[test]
    fn structural_failure_breaks_up() {
        let mut v = on_pad(Kind::UpperStage);
        v.trigger_failure(FailureType::StructuralFailure);
        assert!(v.crashed);
    }

    #[test]
    fn gimbal_lock_freezes_gimbal() {
        let mut v = on_pad(Kind::FullStack);
        let env = Environment::default();
        v.advance(0.02, &ControlSet { gimbal: 0.05, ..ignite() }, &env);
        v.trigger_failure(FailureType::GimbalLock);
        v.advance(0.02, &ControlSet { gimbal: -0.05, ..full() }, &env);
        assert!((v.gimbal - 0.05).abs() < 1e-12);
    }

    #[test]
    fn non_positive_dt_is_ignored() {
        let mut v = on_pad(Kind::FullStack);
        let before = v.pos;
        v.advance(0.0, &ignite(), &Environment::default());
        v.advance(-1.0, &ignite(), &Environment::default());
        assert_eq!(v.pos, before);
        assert_eq!(v.engine, EngineState::Off);
    }

    #[test]
    fn flight_path_angle_from_vertical() {
        let mut v = on_pad(Kind::Payload);
        v.vel = Vector2::new(100.0, 0.0);
        assert!((v.flight_path_angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        v.vel = Vector2::new(0.0, 50.0);
        assert!(v.flight_path_angle().abs() < 1e-12);
    }
}
