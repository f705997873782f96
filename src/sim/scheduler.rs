use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nalgebra::Vector2;
use tracing::{debug, info, warn};

use crate::config::{CooldownClock, SimConfig};
use crate::dynamics::state::{ControlSet, Controls};
use crate::gnc::{AttitudeController, FlightComputer, Mode, ParseErrors, SasMode, Telemetry};
use crate::orbital::{OrbitPrediction, OrbitPredictor};
use crate::physics::Environment;
use crate::safety::{DestructOutcome, FaultInjector, FlightTermination, FtsInput, FtsStatus, Trigger};
use crate::transport::shared::SharedRegion;
use crate::transport::snapshot::{Snapshot, VesselRecord};
use crate::vehicle::{FailureType, Kind, Vessel, VesselId};

use super::clock::{FixedTimestep, SystemClock, WallClock};
use super::event::{EventKind, SimEvent};
use super::staging::{self, IdAllocator};

/// Outcome of one `step` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub events: Vec<SimEvent>,
    /// Ticks that actually advanced the world (0 or 1).
    pub steps: usize,
}

// ---------------------------------------------------------------------------
// Simulation context
// ---------------------------------------------------------------------------

/// Owns the whole simulated world and advances it one fixed tick at a time.
pub struct SimulationContext {
    config: SimConfig,
    vessels: Vec<Vessel>,
    tracked: usize,
    mission_time: f64,
    ids: IdAllocator,
    launch_site: Vector2<f64>,
    timestep: FixedTimestep,
    time_scale: f64,
    clock: Box<dyn WallClock>,
    last_staging: Option<f64>,
    stage_flag: Arc<AtomicBool>,
    flight_computer: FlightComputer,
    attitude: AttitudeController,
    fts: FlightTermination,
    faults: FaultInjector,
    predictor: OrbitPredictor,
    environment: Environment,
    outbox: Vec<SimEvent>,
    last_manual_throttle: Option<f64>,
    script_complete_sent: bool,
    snapshot: Snapshot,
    region: Option<Arc<SharedRegion>>,
}

impl SimulationContext {
    pub fn new(config: SimConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }

    /// Context whose staging cooldown reads `clock`.
    pub fn with_clock(config: SimConfig, clock: impl WallClock + 'static) -> Self {
        let stage_flag = Arc::new(AtomicBool::new(false));
        let mut flight_computer = FlightComputer::new();
        let hook = stage_flag.clone();
        flight_computer.on_stage(Box::new(move || hook.store(true, Ordering::Release)));

        Self {
            timestep: FixedTimestep::new(config.fixed_dt, config.max_frame_time),
            fts: FlightTermination::new(config.fts.clone()),
            predictor: OrbitPredictor::new(config.predictor.clone()),
            config,
            vessels: Vec::new(),
            tracked: 0,
            mission_time: 0.0,
            ids: IdAllocator::default(),
            launch_site: Vector2::zeros(),
            time_scale: 1.0,
            clock: Box::new(clock),
            last_staging: None,
            stage_flag,
            flight_computer,
            attitude: AttitudeController::new(),
            faults: FaultInjector::new(),
            environment: Environment::default(),
            outbox: Vec::new(),
            last_manual_throttle: None,
            script_complete_sent: false,
            snapshot: Snapshot::default(),
            region: None,
        }
    }

    /// Publish every tick into `region` as well.
    pub fn attach_region(&mut self, region: Arc<SharedRegion>) {
        self.region = Some(region);
        self.publish();
    }

    /// Reset every subsystem and put a full stack on the pad.
    pub fn init(&mut self, width: f64, ground_y: f64) {
        self.ids.reset();
        self.mission_time = 0.0;
        self.timestep.reset();
        self.last_staging = None;
        self.stage_flag.store(false, Ordering::Release);
        self.flight_computer.reset();
        self.attitude.reset();
        self.fts.reset();
        self.faults.reset_all(None);
        self.predictor.clear();
        self.outbox.clear();
        self.last_manual_throttle = None;
        self.script_complete_sent = false;
        self.environment = Environment::at(&self.config.environment, 0.0);

        let pad = Vector2::new(width * 0.5, ground_y);
        let mut stack = Vessel::new(self.ids.next_id(), Kind::FullStack, pad, ground_y);
        stack.angle = self.config.vehicle.launch_heading;
        stack.fuel = self.config.vehicle.initial_fuel.clamp(0.0, 1.0);
        self.launch_site = pad;
        self.vessels = vec![stack];
        self.tracked = 0;

        info!(width, ground_y, "simulation initialised");
        self.publish();
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = self.clamp_scale(scale);
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        if scale.is_finite() { scale.clamp(0.0, self.config.max_time_scale) } else { 0.0 }
    }

    /// Bank real elapsed time and run every whole fixed step now due.
    /// One-shot inputs (stage, abort, ignition, cutoff) apply to the first
    /// step only.
    pub fn advance(&mut self, real_elapsed: f64, controls: &Controls) -> usize {
        let steps = self.timestep.accumulate(real_elapsed, self.time_scale);
        let mut input = *controls;
        let mut ran = 0;
        for _ in 0..steps {
            if self.tick(self.config.fixed_dt, &input) {
                ran += 1;
            }
            input.stage = false;
            input.abort = false;
            input.ignition = false;
            input.cutoff = false;
        }
        ran
    }

    /// Exactly one tick of `dt * time_scale`.
    pub fn step(&mut self, dt: f64, time_scale: f64, controls: &Controls) -> TickReport {
        let tick_dt = dt * self.clamp_scale(time_scale);
        let ran = self.tick(tick_dt, controls);
        TickReport { events: self.drain_events(), steps: usize::from(ran) }
    }

    fn tick(&mut self, dt: f64, controls: &Controls) -> bool {
        if !(dt > 0.0) || !dt.is_finite() || self.vessels.is_empty() {
            self.publish();
            return false;
        }
        self.environment = Environment::at(&self.config.environment, self.mission_time);
        let controlled = self.tracked_id();

        // 1-3: manual input, flight computer, stuck throttle
        let resolved = self.resolve_controls(dt, controls);

        // 4: staging request, consumed once
        if controls.stage {
            self.stage_flag.store(true, Ordering::Release);
        }
        if self.stage_flag.swap(false, Ordering::AcqRel) {
            self.try_stage();
        }

        // 5: physics
        let still_tracked = if self.tracked_id() == controlled { controlled } else { None };
        let env = self.environment;
        for vessel in self.vessels.iter_mut().filter(|v| v.active) {
            let set = if Some(vessel.id) == still_tracked { resolved } else { vessel.hold_controls() };
            vessel.advance(dt, &set, &env);
        }

        // 6: faults on the tracked vessel
        let mut fired = Vec::new();
        if let Some(vessel) = self.vessels.get_mut(self.tracked) {
            fired = self.faults.update(vessel, dt);
        }
        let tracked_id = self.tracked_id();
        for id in fired {
            self.emit(EventKind::FaultInjected(id.to_string()), tracked_id);
        }

        // 7: range safety
        let input = self.vessels.get(self.tracked).filter(|v| !v.crashed).map(|v| FtsInput {
            position: v.pos,
            velocity: v.vel,
            altitude: v.altitude(),
            heading: v.angle,
            launch_site: self.launch_site,
        });
        if let Some(input) = input {
            if self.fts.update(&input, dt).destruct_triggered {
                self.destroy_tracked();
            }
        }

        // 8-10
        self.mission_time += dt;
        if let Some(vessel) = self.vessels.get(self.tracked) {
            self.predictor.refresh(vessel, self.mission_time);
        }
        self.publish();
        true
    }

    fn resolve_controls(&mut self, dt: f64, controls: &Controls) -> ControlSet {
        let mut set = ControlSet {
            throttle: controls.throttle,
            gimbal: 0.0,
            ignition: controls.ignition,
            cutoff: controls.cutoff,
        };
        let manual_changed = matches!(
            self.last_manual_throttle,
            Some(prev) if (prev - controls.throttle).abs() > 1e-9
        );
        self.last_manual_throttle = Some(controls.throttle);

        let mut abort = controls.abort;
        let mut pitch = None;
        if self.flight_computer.mode() == Mode::Running {
            if manual_changed {
                self.flight_computer.override_throttle(controls.throttle);
            }
            let telemetry = Telemetry::from_vessel(&self.vessels[self.tracked], self.mission_time);
            let out = self.flight_computer.update(&telemetry);
            if let Some(throttle) = out.throttle {
                set.throttle = throttle;
            }
            if let Some(mode) = out.sas {
                self.attitude.set_mode(mode);
            }
            pitch = out.pitch;
            abort |= out.abort;
            if out.all_completed && !self.script_complete_sent {
                self.script_complete_sent = true;
                let id = self.tracked_id();
                self.emit(EventKind::ScriptComplete, id);
            }
        }

        // A held script pitch outranks manual steering.
        let vessel = &self.vessels[self.tracked];
        let vessel_id = vessel.id;
        let steering = controls.gimbal_angle;
        let steering = if steering.is_finite() { steering } else { 0.0 };
        let autopilot = !vessel.reliability.has(FailureType::SasFailure);
        set.gimbal = match pitch {
            Some(p) if autopilot => self.attitude.track_pitch(vessel, p, dt),
            _ if steering != 0.0 => {
                self.attitude.release_hold();
                steering
            }
            _ if autopilot => self.attitude.stabilize(vessel, dt),
            _ => 0.0,
        };

        if abort {
            self.abort();
            set.throttle = 0.0;
            set.cutoff = true;
            set.ignition = false;
        }

        if let Some(stuck) = self.faults.throttle_override(vessel_id) {
            set.throttle = stuck;
        }
        set
    }

    fn try_stage(&mut self) {
        let now = match self.config.cooldown_clock {
            CooldownClock::Wall => self.clock.now(),
            CooldownClock::Mission => self.mission_time,
        };
        if let Some(last) = self.last_staging {
            if now - last < self.config.staging_cooldown {
                debug!(since = now - last, "stage request debounced");
                return;
            }
        }
        let Some(sep) = staging::stage(&mut self.vessels, self.tracked, &mut self.ids) else {
            debug!("nothing to stage");
            return;
        };
        self.last_staging = Some(now);
        self.tracked = sep.tracked;
        self.attitude.release_hold();
        let live: Vec<VesselId> = self.vessels.iter().map(|v| v.id).collect();
        self.predictor.retain(|id| live.contains(&id));
        let id = self.tracked_id();
        self.emit(sep.event, id);
    }

    fn destroy_tracked(&mut self) {
        let Some(vessel) = self.vessels.get_mut(self.tracked) else {
            return;
        };
        if vessel.explode() {
            let id = vessel.id;
            warn!(vessel = id.0, "vessel destroyed by flight termination");
            self.emit(EventKind::FtsDestruct, Some(id));
        }
    }

    fn emit(&mut self, kind: EventKind, vessel: Option<VesselId>) {
        self.outbox.push(SimEvent::new(self.mission_time, kind, vessel));
    }

    fn publish(&mut self) {
        self.snapshot = Snapshot {
            mission_time: self.mission_time,
            tracked: self.tracked,
            wind_x: self.environment.wind.x,
            wind_y: self.environment.wind.y,
            density_multiplier: self.environment.density_multiplier,
            fts: self.fts.status(),
            vessels: self.vessels.iter().map(VesselRecord::from).collect(),
        };
        if let Some(region) = &self.region {
            region.write(&self.snapshot);
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a staging request for the next tick.
    pub fn request_stage(&mut self) {
        self.stage_flag.store(true, Ordering::Release);
    }

    /// Cut the tracked engine, stand the flight computer down, report ABORT.
    pub fn abort(&mut self) {
        self.flight_computer.deactivate();
        let id = self.tracked_id();
        if let Some(vessel) = self.vessels.get_mut(self.tracked) {
            vessel.throttle = 0.0;
        }
        warn!(vessel = ?id, "abort");
        self.emit(EventKind::Abort, id);
    }

    pub fn load_script(&mut self, name: &str, text: &str) -> Result<usize, ParseErrors> {
        self.flight_computer.load_text(name, text)
    }

    pub fn activate(&mut self) -> bool {
        self.script_complete_sent = false;
        self.flight_computer.activate()
    }

    pub fn deactivate(&mut self) {
        self.flight_computer.deactivate();
    }

    pub fn toggle_pause(&mut self) {
        self.flight_computer.toggle_pause();
    }

    pub fn set_sas(&mut self, mode: SasMode) {
        self.attitude.set_mode(mode);
    }

    pub fn arm_fault(&mut self, id: &str, trigger: Trigger) -> bool {
        self.faults.arm(id, trigger)
    }

    pub fn inject_fault(&mut self, id: &str) -> bool {
        let Some(vessel) = self.vessels.get_mut(self.tracked) else {
            return false;
        };
        let vessel_id = vessel.id;
        let injected = self.faults.inject(id, vessel);
        if injected {
            self.emit(EventKind::FaultInjected(id.to_string()), Some(vessel_id));
        }
        injected
    }

    pub fn reset_fault(&mut self, id: &str) {
        self.faults.reset(id, self.vessels.get_mut(self.tracked));
    }

    pub fn fts_arm(&mut self) {
        self.fts.arm();
    }

    pub fn fts_disarm(&mut self) {
        self.fts.disarm();
    }

    pub fn manual_destruct(&mut self) -> DestructOutcome {
        let outcome = self.fts.manual_destruct();
        if outcome == DestructOutcome::Executed {
            self.destroy_tracked();
            self.publish();
        }
        outcome
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.outbox)
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn mission_time(&self) -> f64 {
        self.mission_time
    }

    pub fn vessels(&self) -> &[Vessel] {
        &self.vessels
    }

    pub fn tracked_index(&self) -> usize {
        self.tracked
    }

    pub fn tracked_vessel(&self) -> Option<&Vessel> {
        self.vessels.get(self.tracked)
    }

    fn tracked_id(&self) -> Option<VesselId> {
        self.tracked_vessel().map(|v| v.id)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn fts_status(&self) -> FtsStatus {
        self.fts.status()
    }

    pub fn flight_computer(&self) -> &FlightComputer {
        &self.flight_computer
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    pub fn sas_mode(&self) -> SasMode {
        self.attitude.mode()
    }

    /// Latest predicted path of the tracked vessel.
    pub fn prediction(&self) -> Option<&OrbitPrediction> {
        self.tracked_id().and_then(|id| self.predictor.get(id))
    }
}
