use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use strum_macros::Display;
use tracing::{debug, info};

use crate::vehicle::{FailureType, Vessel, VesselId};

/// Fuel leak drain as a multiple of the nominal full-throttle burn rate.
pub const FUEL_LEAK_FACTOR: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum FaultCategory {
    Propulsion,
    Control,
    Avionics,
    Structure,
}

/// How an injected fault acts on the vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultEffect {
    /// Handed to the vessel's reliability subsystem.
    Failure(FailureType),
    /// Throttle pinned at its value when injected.
    StuckThrottle,
    /// Continuous propellant loss.
    FuelLeak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: FaultCategory,
    pub effect: FaultEffect,
}

pub const FAULT_CATALOG: &[FaultDefinition] = &[
    FaultDefinition {
        id: "engine-flameout",
        name: "Engine flameout",
        category: FaultCategory::Propulsion,
        effect: FaultEffect::Failure(FailureType::EngineFlameout),
    },
    FaultDefinition {
        id: "ignition-failure",
        name: "Ignition failure",
        category: FaultCategory::Propulsion,
        effect: FaultEffect::Failure(FailureType::IgnitionFailure),
    },
    FaultDefinition {
        id: "gimbal-lock",
        name: "Gimbal lock",
        category: FaultCategory::Control,
        effect: FaultEffect::Failure(FailureType::GimbalLock),
    },
    FaultDefinition {
        id: "throttle-stuck",
        name: "Throttle stuck",
        category: FaultCategory::Propulsion,
        effect: FaultEffect::StuckThrottle,
    },
    FaultDefinition {
        id: "fuel-leak",
        name: "Fuel leak",
        category: FaultCategory::Propulsion,
        effect: FaultEffect::FuelLeak,
    },
    FaultDefinition {
        id: "sensor-glitch",
        name: "Sensor glitch",
        category: FaultCategory::Avionics,
        effect: FaultEffect::Failure(FailureType::SensorGlitch),
    },
    FaultDefinition {
        id: "sas-failure",
        name: "SAS failure",
        category: FaultCategory::Control,
        effect: FaultEffect::Failure(FailureType::SasFailure),
    },
    FaultDefinition {
        id: "structural-failure",
        name: "Structural failure",
        category: FaultCategory::Structure,
        effect: FaultEffect::Failure(FailureType::StructuralFailure),
    },
];

pub fn lookup(id: &str) -> Option<&'static FaultDefinition> {
    FAULT_CATALOG.iter().find(|f| f.id == id)
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

pub type FaultPredicate = Arc<dyn Fn(&Vessel, f64) -> bool + Send + Sync>;

/// When an armed fault fires on its own.
#[derive(Clone)]
pub enum Trigger {
    /// On the next update.
    Immediate,
    /// Once this many seconds have passed since arming.
    Timed(f64),
    /// When the predicate over (vessel, altitude) holds.
    Conditional(FaultPredicate),
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Immediate => write!(f, "Immediate"),
            Trigger::Timed(delay) => write!(f, "Timed({delay})"),
            Trigger::Conditional(_) => write!(f, "Conditional(..)"),
        }
    }
}

impl Trigger {
    pub fn when(predicate: impl Fn(&Vessel, f64) -> bool + Send + Sync + 'static) -> Self {
        Trigger::Conditional(Arc::new(predicate))
    }

    fn fires(&self, vessel: &Vessel, elapsed: f64) -> bool {
        match self {
            Trigger::Immediate => true,
            Trigger::Timed(delay) => elapsed >= *delay,
            Trigger::Conditional(predicate) => predicate(vessel, vessel.altitude()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum FaultStatus {
    Ready,
    Armed,
    Injected,
}

#[derive(Debug, Clone)]
pub struct ActiveFault {
    pub definition: &'static FaultDefinition,
    pub status: FaultStatus,
    pub trigger: Trigger,
    pub elapsed: f64,
    /// Vessel the fault was injected into; its effects stay with it.
    pub vessel: Option<VesselId>,
    captured_throttle: Option<f64>,
}

impl ActiveFault {
    fn new(definition: &'static FaultDefinition, trigger: Trigger) -> Self {
        Self {
            definition,
            status: FaultStatus::Armed,
            trigger,
            elapsed: 0.0,
            vessel: None,
            captured_throttle: None,
        }
    }

    fn inject(&mut self, vessel: &mut Vessel) {
        self.status = FaultStatus::Injected;
        self.vessel = Some(vessel.id);
        match self.definition.effect {
            FaultEffect::Failure(failure) => vessel.trigger_failure(failure),
            FaultEffect::StuckThrottle => self.captured_throttle = Some(vessel.throttle),
            FaultEffect::FuelLeak => {}
        }
        info!(fault = self.definition.id, vessel = vessel.id.0, "fault injected");
    }

    fn applies_to(&self, id: VesselId) -> bool {
        self.status == FaultStatus::Injected && self.vessel == Some(id)
    }

    fn apply_persistent(&self, vessel: &mut Vessel, dt: f64) {
        if !vessel.active || !self.applies_to(vessel.id) {
            return;
        }
        match self.definition.effect {
            FaultEffect::StuckThrottle => {
                if let Some(throttle) = self.captured_throttle {
                    vessel.throttle = throttle;
                }
            }
            FaultEffect::FuelLeak => {
                let drain = FUEL_LEAK_FACTOR * vessel.spec.nominal_burn_rate() * dt;
                vessel.fuel = (vessel.fuel - drain).max(0.0);
            }
            FaultEffect::Failure(_) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Injector
// ---------------------------------------------------------------------------

/// Two-phase fault activation: arm, then inject by hand or by trigger.
#[derive(Debug, Clone, Default)]
pub struct FaultInjector {
    faults: Vec<ActiveFault>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fault. Re-arming replaces a pending instance; an injected
    /// fault must be reset first. Unknown ids are ignored.
    pub fn arm(&mut self, id: &str, trigger: Trigger) -> bool {
        let Some(definition) = lookup(id) else {
            debug!(id, "arm ignored, unknown fault");
            return false;
        };
        match self.faults.iter_mut().find(|f| f.definition.id == id) {
            Some(existing) if existing.status == FaultStatus::Injected => {
                debug!(id, "arm ignored, fault already injected");
                false
            }
            Some(existing) => {
                *existing = ActiveFault::new(definition, trigger);
                true
            }
            None => {
                debug!(id, ?trigger, "fault armed");
                self.faults.push(ActiveFault::new(definition, trigger));
                true
            }
        }
    }

    /// Inject an armed fault now.
    pub fn inject(&mut self, id: &str, vessel: &mut Vessel) -> bool {
        match self.faults.iter_mut().find(|f| f.definition.id == id) {
            Some(fault) if fault.status == FaultStatus::Armed => {
                fault.inject(vessel);
                fault.apply_persistent(vessel, 0.0);
                true
            }
            _ => {
                debug!(id, "inject ignored, fault not armed");
                false
            }
        }
    }

    /// Fire due triggers and apply persistent effects. Returns the ids
    /// injected on this update.
    pub fn update(&mut self, vessel: &mut Vessel, dt: f64) -> Vec<&'static str> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut injected = Vec::new();
        for fault in &mut self.faults {
            match fault.status {
                FaultStatus::Armed => {
                    fault.elapsed += dt;
                    if fault.trigger.fires(vessel, fault.elapsed) {
                        fault.inject(vessel);
                        injected.push(fault.definition.id);
                    }
                }
                FaultStatus::Injected => fault.apply_persistent(vessel, dt),
                FaultStatus::Ready => {}
            }
        }
        injected
    }

    /// Throttle pinned by a stuck-throttle fault injected into `vessel`.
    pub fn throttle_override(&self, vessel: VesselId) -> Option<f64> {
        self.faults
            .iter()
            .filter(|f| f.applies_to(vessel))
            .find_map(|f| f.captured_throttle)
    }

    /// Remove one fault and undo its vessel-side failure.
    pub fn reset(&mut self, id: &str, vessel: Option<&mut Vessel>) {
        let Some(pos) = self.faults.iter().position(|f| f.definition.id == id) else {
            debug!(id, "reset ignored, fault not active");
            return;
        };
        let fault = self.faults.remove(pos);
        if let (FaultEffect::Failure(failure), Some(vessel)) = (fault.definition.effect, vessel) {
            if fault.vessel == Some(vessel.id) {
                vessel.reliability.clear(failure);
            }
        }
        info!(fault = id, "fault reset");
    }

    pub fn reset_all(&mut self, vessel: Option<&mut Vessel>) {
        if let Some(vessel) = vessel {
            for fault in self.faults.iter().filter(|f| f.vessel == Some(vessel.id)) {
                if let FaultEffect::Failure(failure) = fault.definition.effect {
                    vessel.reliability.clear(failure);
                }
            }
        }
        self.faults.clear();
    }

    pub fn status(&self, id: &str) -> Option<FaultStatus> {
        match self.faults.iter().find(|f| f.definition.id == id) {
            Some(fault) => Some(fault.status),
            None => lookup(id).map(|_| FaultStatus::Ready),
        }
    }

    pub fn active(&self) -> impl Iterator<Item = &ActiveFault> {
        self.faults.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{EngineState, Kind, VesselId};
    use nalgebra::Vector2;

    fn vessel() -> Vessel {
        let mut v = Vessel::new(VesselId(1), Kind::UpperStage, Vector2::new(0.0, -20_000.0), 0.0);
        v.engine = EngineState::Running;
        v.throttle = 0.7;
        v
    }

    #[test]
    fn catalog_ids_resolve() {
        assert_eq!(FAULT_CATALOG.len(), 8);
        for def in FAULT_CATALOG {
            if let FaultEffect::Failure(failure) = def.effect {
                assert_eq!(failure.to_string(), def.id);
            }
        }
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut inj = FaultInjector::new();
        let mut v = vessel();
        assert!(!inj.arm("warp-core-breach", Trigger::Immediate));
        assert!(!inj.inject("warp-core-breach", &mut v));
        inj.reset("warp-core-breach", Some(&mut v));
        assert!(inj.status("warp-core-breach").is_none());
    }

    #[test]
    fn inject_requires_arm() {
        let mut inj = FaultInjector::new();
        let mut v = vessel();
        assert_eq!(inj.status("gimbal-lock"), Some(FaultStatus::Ready));
        assert!(!inj.inject("gimbal-lock", &mut v));
        inj.arm("gimbal-lock", Trigger::Timed(100.0));
        assert!(inj.inject("gimbal-lock", &mut v));
        assert!(v.reliability.has(FailureType::GimbalLock));
        assert!(!inj.inject("gimbal-lock", &mut v), "injects exactly once");
    }

    #[test]
    fn timed_trigger_fires_once() {
        let mut inj = FaultInjector::new();
        let mut v = vessel();
        inj.arm("engine-flameout", Trigger::Timed(1.0));
        let mut fired = Vec::new();
        for _ in 0..100 {
            fired.extend(inj.update(&mut v, 0.02));
        }
        assert_eq!(fired, vec!["engine-flameout"]);
        assert_eq!(v.engine, EngineState::Flameout);
        assert_eq!(inj.status("engine-flameout"), Some(FaultStatus::Injected));
    }

    #[test]
    fn conditional_trigger_sees_altitude() {
        let mut inj = FaultInjector::new();
        let mut v = vessel();
        inj.arm("sensor-glitch", Trigger::when(|_, alt| alt > 25_000.0));
        assert!(inj.update(&mut v, 0.02).is_empty());
        v.pos.y = -30_000.0;
        assert_eq!(inj.update(&mut v, 0.02), vec!["sensor-glitch"]);
    }

    #[test]
    fn rearm_replaces_pending() {
        let mut inj = FaultInjector::new();
        let mut v = vessel();
        inj.arm("fuel-leak", Trigger::Timed(0.5));
        inj.update(&mut v, 0.4);
        inj.arm("fuel-leak", Trigger::Timed(0.5));
        assert!(inj.update(&mut v, 0.2).is_empty(), "timer restarted");
        assert_eq!(inj.active().count(), 1);
    }

    #[test]
    fn stuck_throttle_pins_value_until_reset() {
        let mut inj = FaultInjector::new();
        let mut v = vessel();
        inj.arm("throttle-stuck", Trigger::Immediate);
        inj.update(&mut v, 0.02);
        assert_eq!(inj.throttle_override(v.id), Some(0.7));

        for _ in 0..10 {
            v.throttle = 0.1;
            inj.update(&mut v, 0.02);
            assert_eq!(v.throttle, 0.7);
        }

        inj.reset("throttle-stuck", Some(&mut v));
        assert_eq!(inj.throttle_override(v.id), None);
        v.throttle = 0.1;
        inj.update(&mut v, 0.02);
        assert_eq!(v.throttle, 0.1);
    }

    #[test]
    fn effects_stay_with_the_injected_vessel() {
        let mut inj = FaultInjector::new();
        let mut first = vessel();
        inj.arm("throttle-stuck", Trigger::Immediate);
        inj.arm("fuel-leak", Trigger::Immediate);
        inj.update(&mut first, 0.02);
        assert_eq!(inj.throttle_override(first.id), Some(0.7));

        let mut next = Vessel::new(VesselId(2), Kind::Payload, Vector2::new(0.0, -20_000.0), 0.0);
        next.throttle = 0.2;
        next.fuel = 0.5;
        for _ in 0..10 {
            inj.update(&mut next, 0.02);
        }
        assert_eq!(inj.throttle_override(next.id), None);
        assert_eq!(next.throttle, 0.2);
        assert_eq!(next.fuel, 0.5);
    }

    #[test]
    fn fuel_leak_drains_to_zero() {
        let mut inj = FaultInjector::new();
        let mut v = vessel();
        v.fuel = 0.01;
        inj.arm("fuel-leak", Trigger::Immediate);
        inj.update(&mut v, 0.02);
        let before = v.fuel;
        inj.update(&mut v, 0.02);
        let expected = before - FUEL_LEAK_FACTOR * v.spec.nominal_burn_rate() * 0.02;
        assert!((v.fuel - expected.max(0.0)).abs() < 1e-12);
        for _ in 0..10_000 {
            inj.update(&mut v, 0.02);
        }
        assert_eq!(v.fuel, 0.0);
    }

    #[test]
    fn reset_clears_vessel_failure() {
        let mut inj = FaultInjector::new();
        let mut v = vessel();
        inj.arm("sas-failure", Trigger::Immediate);
        inj.update(&mut v, 0.02);
        assert!(v.reliability.has(FailureType::SasFailure));
        inj.reset_all(Some(&mut v));
        assert!(!v.reliability.has(FailureType::SasFailure));
        assert_eq!(inj.active().count(), 0);
    }
}
