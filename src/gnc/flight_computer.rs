use std::fmt;

use strum_macros::Display;
use tracing::{debug, info};

use crate::vehicle::Vessel;
use super::attitude::SasMode;
use super::script::{Action, CommandState, MissionScript, ParseErrors, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    Off,
    Standby,
    Running,
    Paused,
}

// ---------------------------------------------------------------------------
// Telemetry seen by the script
// ---------------------------------------------------------------------------

/// Values a script condition can test. Fractions are stored as 0..1 and
/// exposed to scripts as percent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Telemetry {
    pub altitude: f64,
    pub velocity: f64,
    pub vertical_vel: f64,
    pub horizontal_vel: f64,
    pub apogee: f64,
    pub fuel: f64,
    pub time: f64,
    pub throttle: f64,
    pub dynamic_pressure: f64,
}

impl Telemetry {
    pub fn from_vessel(vessel: &Vessel, mission_time: f64) -> Self {
        Self {
            altitude: vessel.sensed_altitude(),
            velocity: vessel.vel.norm(),
            vertical_vel: vessel.vel.y,
            horizontal_vel: vessel.vel.x.abs(),
            apogee: vessel.telemetry.apogee,
            fuel: vessel.fuel,
            time: mission_time,
            throttle: vessel.throttle,
            dynamic_pressure: vessel.telemetry.dynamic_pressure,
        }
    }

    pub fn get(&self, variable: Variable) -> f64 {
        match variable {
            Variable::Altitude => self.altitude,
            Variable::Velocity => self.velocity,
            Variable::VerticalVel => self.vertical_vel,
            Variable::HorizontalVel => self.horizontal_vel,
            Variable::Apogee => self.apogee,
            Variable::Fuel => self.fuel * 100.0,
            Variable::Time => self.time,
            Variable::Throttle => self.throttle * 100.0,
            Variable::DynamicPressure => self.dynamic_pressure,
        }
    }
}

/// What the flight computer wants this tick. `None` leaves the channel to
/// manual control.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GuidanceOutput {
    pub pitch: Option<f64>,
    pub throttle: Option<f64>,
    pub sas: Option<SasMode>,
    pub stage: bool,
    pub abort: bool,
    /// No command is left waiting on its condition.
    pub all_completed: bool,
}

pub type StageCallback = Box<dyn FnMut() + Send>;

// ---------------------------------------------------------------------------
// Flight computer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FlightComputer {
    mode: Mode,
    script: Option<MissionScript>,
    held_pitch: Option<f64>,
    held_throttle: Option<f64>,
    held_sas: Option<SasMode>,
    on_stage: Option<StageCallback>,
}

impl fmt::Debug for FlightComputer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlightComputer")
            .field("mode", &self.mode)
            .field("script", &self.script.as_ref().map(|s| s.name.as_str()))
            .field("held_pitch", &self.held_pitch)
            .field("held_throttle", &self.held_throttle)
            .field("held_sas", &self.held_sas)
            .finish()
    }
}

impl FlightComputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn script(&self) -> Option<&MissionScript> {
        self.script.as_ref()
    }

    /// Register the hook a `STAGE` action calls into.
    pub fn on_stage(&mut self, callback: StageCallback) {
        self.on_stage = Some(callback);
    }

    /// Install a parsed script and go to standby.
    pub fn load(&mut self, mut script: MissionScript) {
        script.reset();
        info!(name = %script.name, commands = script.commands.len(), "mission script loaded");
        self.script = Some(script);
        self.clear_targets();
        self.mode = Mode::Standby;
    }

    /// Parse and load. A rejected script leaves the current one in place.
    pub fn load_text(&mut self, name: &str, text: &str) -> Result<usize, ParseErrors> {
        let script = MissionScript::parse(name, text)?;
        let count = script.commands.len();
        self.load(script);
        Ok(count)
    }

    /// Start running from the top of the script. Returns `false` when no
    /// script is loaded.
    pub fn activate(&mut self) -> bool {
        let Some(script) = self.script.as_mut() else {
            debug!("activate ignored, no script loaded");
            return false;
        };
        script.reset();
        let name = script.name.clone();
        self.clear_targets();
        self.mode = Mode::Running;
        info!(name = %name, "flight computer running");
        true
    }

    pub fn deactivate(&mut self) {
        if matches!(self.mode, Mode::Running | Mode::Paused) {
            self.mode = Mode::Standby;
            self.clear_targets();
            info!("flight computer standby");
        }
    }

    pub fn toggle_pause(&mut self) {
        self.mode = match self.mode {
            Mode::Running => Mode::Paused,
            Mode::Paused => Mode::Running,
            other => other,
        };
        debug!(mode = %self.mode, "pause toggled");
    }

    /// Back to `Off`; the script is discarded.
    pub fn reset(&mut self) {
        self.mode = Mode::Off;
        self.script = None;
        self.clear_targets();
    }

    /// Manual throttle took over: it replaces the held scripted target.
    pub fn override_throttle(&mut self, throttle: f64) {
        if self.mode == Mode::Running && throttle.is_finite() {
            self.held_throttle = Some(throttle.clamp(0.0, 1.0));
        }
    }

    /// Evaluate every unfinished command against `telemetry`.
    pub fn update(&mut self, telemetry: &Telemetry) -> GuidanceOutput {
        let mut out = GuidanceOutput::default();
        if self.mode != Mode::Running {
            return out;
        }
        let Some(script) = self.script.as_mut() else {
            return out;
        };

        for cmd in script.commands.iter_mut() {
            if cmd.state == CommandState::Completed {
                continue;
            }
            let satisfied = cmd.condition.evaluate(|v| telemetry.get(v));
            let (next, fire) = cmd.state.transition(satisfied, cmd.one_shot);
            cmd.state = next;
            if !fire {
                continue;
            }
            debug!(id = cmd.id, command = %cmd.source_text, "command fired");
            match cmd.action {
                Action::Pitch(rad) => self.held_pitch = Some(rad),
                Action::Throttle(frac) => self.held_throttle = Some(frac),
                Action::Sas(mode) => self.held_sas = Some(mode),
                Action::Stage => {
                    out.stage = true;
                    if let Some(callback) = self.on_stage.as_mut() {
                        callback();
                    }
                }
                Action::Abort => out.abort = true,
            }
        }

        out.pitch = self.held_pitch;
        out.throttle = self.held_throttle;
        out.sas = self.held_sas;
        out.all_completed = script.pending() == 0;
        out
    }

    fn clear_targets(&mut self) {
        self.held_pitch = None;
        self.held_throttle = None;
        self.held_sas = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn running(text: &str) -> FlightComputer {
        let mut fc = FlightComputer::new();
        fc.load_text("test", text).unwrap();
        assert!(fc.activate());
        fc
    }

    fn at_altitude(altitude: f64) -> Telemetry {
        Telemetry { altitude, fuel: 1.0, ..Default::default() }
    }

    #[test]
    fn mode_lifecycle() {
        let mut fc = FlightComputer::new();
        assert_eq!(fc.mode(), Mode::Off);
        assert!(!fc.activate());
        fc.load_text("t", "WHEN TIME > 0 THEN STAGE").unwrap();
        assert_eq!(fc.mode(), Mode::Standby);
        fc.activate();
        assert_eq!(fc.mode(), Mode::Running);
        fc.toggle_pause();
        assert_eq!(fc.mode(), Mode::Paused);
        fc.toggle_pause();
        assert_eq!(fc.mode(), Mode::Running);
        fc.deactivate();
        assert_eq!(fc.mode(), Mode::Standby);
        assert!(fc.script().is_some());
        fc.reset();
        assert_eq!(fc.mode(), Mode::Off);
        assert!(fc.script().is_none());
    }

    #[test]
    fn reactivation_drops_held_targets() {
        let mut fc = running("WHEN ALTITUDE > 100 THEN THROTTLE 60");
        assert_eq!(fc.update(&at_altitude(150.0)).throttle, Some(0.6));
        assert!(fc.activate());
        assert_eq!(fc.mode(), Mode::Running);
        assert_eq!(fc.script().map(|s| s.name.as_str()), Some("test"));
        assert_eq!(fc.update(&at_altitude(10.0)).throttle, None);
    }

    #[test]
    fn rejected_script_keeps_previous() {
        let mut fc = FlightComputer::new();
        fc.load_text("good", "WHEN TIME > 0 THEN STAGE").unwrap();
        assert!(fc.load_text("bad", "STAGE NOW").is_err());
        assert_eq!(fc.script().map(|s| s.name.as_str()), Some("good"));
    }

    #[test]
    fn pitch_command_at_altitude() {
        let mut fc = running("WHEN ALTITUDE > 100 THEN PITCH 80");
        assert_eq!(fc.update(&at_altitude(50.0)).pitch, None);
        let out = fc.update(&at_altitude(150.0));
        let pitch = out.pitch.unwrap();
        assert!((pitch - 1.396).abs() < 1e-3);
    }

    #[test]
    fn held_targets_are_sticky() {
        let mut fc = running("WHEN ALTITUDE > 100 THEN THROTTLE 60");
        fc.update(&at_altitude(150.0));
        // Condition drops away: command reverts to pending, target stays.
        let out = fc.update(&at_altitude(10.0));
        assert_eq!(out.throttle, Some(0.6));
        assert_eq!(fc.script().unwrap().commands[0].state, CommandState::Pending);
    }

    #[test]
    fn one_shot_fires_once_per_activation() {
        let mut fc = running("WHEN ALTITUDE > 0 THEN STAGE\nWHEN ALTITUDE > 0 THEN ABORT");
        let count = Arc::new(AtomicUsize::new(0));
        let hits = count.clone();
        fc.on_stage(Box::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        }));

        let mut aborts = 0;
        for _ in 0..50 {
            let out = fc.update(&at_altitude(500.0));
            if out.abort {
                aborts += 1;
            }
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(aborts, 1);

        // Re-activation re-arms the one-shots.
        fc.activate();
        fc.update(&at_altitude(500.0));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn paused_computer_is_silent() {
        let mut fc = running("WHEN ALTITUDE > 0 THEN STAGE");
        fc.toggle_pause();
        assert!(!fc.update(&at_altitude(10.0)).stage);
        fc.toggle_pause();
        assert!(fc.update(&at_altitude(10.0)).stage);
    }

    #[test]
    fn manual_throttle_replaces_held_target() {
        let mut fc = running("WHEN TIME >= 0 THEN THROTTLE 100");
        assert_eq!(fc.update(&Telemetry::default()).throttle, Some(1.0));
        fc.override_throttle(0.3);
        assert_eq!(fc.update(&Telemetry::default()).throttle, Some(0.3));
    }

    #[test]
    fn fuel_and_throttle_read_as_percent() {
        let t = Telemetry { fuel: 0.25, throttle: 0.5, ..Default::default() };
        assert_eq!(t.get(Variable::Fuel), 25.0);
        assert_eq!(t.get(Variable::Throttle), 50.0);
    }

    #[test]
    fn reports_settled_script() {
        let mut fc = running("WHEN TIME > 5 THEN STAGE");
        assert!(!fc.update(&Telemetry { time: 1.0, ..Default::default() }).all_completed);
        assert!(fc.update(&Telemetry { time: 6.0, ..Default::default() }).all_completed);
    }
}
