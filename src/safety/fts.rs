use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{info, warn};

use crate::gnc::attitude::wrap_angle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FtsState {
    #[default]
    Safe,
    Warning,
    Arm,
    Destruct,
}

impl FtsState {
    pub fn code(self) -> u8 {
        match self {
            FtsState::Safe => 0,
            FtsState::Warning => 1,
            FtsState::Arm => 2,
            FtsState::Destruct => 3,
        }
    }
}

/// Range-safety violations, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Violation {
    #[default]
    None,
    Tumble,
    Corridor,
    Altitude,
    Trajectory,
}

impl Violation {
    pub fn code(self) -> u8 {
        match self {
            Violation::None => 0,
            Violation::Tumble => 1,
            Violation::Corridor => 2,
            Violation::Altitude => 3,
            Violation::Trajectory => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FtsConfig {
    pub warning_to_arm: f64,         // s
    pub arm_to_destruct: f64,        // s
    pub auto_destruct: bool,
    pub altitude_floor: f64,         // m
    pub tumble_limit: f64,           // rad/s
    pub corridor_half_width: f64,    // m at the pad
    pub corridor_widening: f64,      // m of half-width per m of altitude
    pub corridor_ceiling: f64,       // m, corridor not enforced above
    pub altitude_ceiling: f64,       // m
    pub max_flight_path_angle: f64,  // rad from vertical
    pub trajectory_check_below: f64, // m
    pub trajectory_min_speed: f64,   // m/s
}

impl Default for FtsConfig {
    fn default() -> Self {
        Self {
            warning_to_arm: 3.0,
            arm_to_destruct: 3.0,
            auto_destruct: true,
            altitude_floor: 10.0,
            tumble_limit: 1.5,
            corridor_half_width: 5_000.0,
            corridor_widening: 4.0,
            corridor_ceiling: 150_000.0,
            altitude_ceiling: 1_000_000.0,
            max_flight_path_angle: 60f64.to_radians(),
            trajectory_check_below: 30_000.0,
            trajectory_min_speed: 20.0,
        }
    }
}

/// Kinematics of the tracked vessel for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FtsInput {
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>, // vy up positive
    pub altitude: f64,
    pub heading: f64,           // rad from vertical
    pub launch_site: Vector2<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FtsStatus {
    pub state: FtsState,
    pub armed: bool,
    pub violation: Violation,
    pub warning_timer: f64,
    pub arm_timer: f64,
    /// 0 on the centre line, 1 at the corridor edge.
    pub corridor_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FtsUpdate {
    pub state: FtsState,
    pub violation: Violation,
    /// DESTRUCT was entered on this update.
    pub destruct_triggered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum DestructOutcome {
    Executed,
    Denied,
}

// ---------------------------------------------------------------------------
// Flight termination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct FlightTermination {
    pub config: FtsConfig,
    status: FtsStatus,
    prev_heading: Option<f64>,
}

impl FlightTermination {
    pub fn new(config: FtsConfig) -> Self {
        Self { config, status: FtsStatus::default(), prev_heading: None }
    }

    pub fn status(&self) -> FtsStatus {
        self.status
    }

    /// Manual arm by the range-safety operator. Independent of the state.
    pub fn arm(&mut self) {
        if !self.status.armed {
            info!("FTS armed by operator");
        }
        self.status.armed = true;
    }

    pub fn disarm(&mut self) {
        self.status.armed = false;
    }

    /// Destruct on operator command. Only honoured when armed.
    pub fn manual_destruct(&mut self) -> DestructOutcome {
        if !self.status.armed {
            info!("manual destruct denied, FTS not armed");
            return DestructOutcome::Denied;
        }
        if self.status.state != FtsState::Destruct {
            warn!("manual destruct executed");
            self.status.state = FtsState::Destruct;
        }
        DestructOutcome::Executed
    }

    pub fn reset(&mut self) {
        self.status = FtsStatus::default();
        self.prev_heading = None;
    }

    fn classify(&self, input: &FtsInput, rate: f64, corridor_fraction: f64) -> Violation {
        let cfg = &self.config;
        let alt = input.altitude;
        let speed = input.velocity.norm();
        if rate > cfg.tumble_limit {
            return Violation::Tumble;
        }
        if alt <= cfg.corridor_ceiling && corridor_fraction > 1.0 {
            return Violation::Corridor;
        }
        if alt > cfg.altitude_ceiling {
            return Violation::Altitude;
        }
        if alt < cfg.trajectory_check_below && speed > cfg.trajectory_min_speed {
            let fpa = (input.velocity.y / speed).clamp(-1.0, 1.0).acos();
            if fpa > cfg.max_flight_path_angle {
                return Violation::Trajectory;
            }
        }
        Violation::None
    }

    /// Evaluate one tick. Total over all inputs.
    pub fn update(&mut self, input: &FtsInput, dt: f64) -> FtsUpdate {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let rate = match self.prev_heading {
            Some(prev) if dt > 0.0 => wrap_angle(input.heading - prev).abs() / dt,
            _ => 0.0,
        };
        if input.heading.is_finite() {
            self.prev_heading = Some(input.heading);
        }

        let cfg = &self.config;
        let half_width = cfg.corridor_half_width + cfg.corridor_widening * input.altitude.max(0.0);
        let lateral = (input.position.x - input.launch_site.x).abs();
        self.status.corridor_fraction = if half_width > 0.0 { lateral / half_width } else { 0.0 };

        if self.status.state == FtsState::Destruct {
            return self.report(false);
        }

        if !(input.altitude >= self.config.altitude_floor) {
            self.status.state = FtsState::Safe;
            self.status.violation = Violation::None;
            self.status.warning_timer = 0.0;
            self.status.arm_timer = 0.0;
            return self.report(false);
        }

        let violation = self.classify(input, rate, self.status.corridor_fraction);
        self.status.violation = violation;
        let before = self.status.state;

        if violation == Violation::None {
            self.status.state = FtsState::Safe;
            self.status.warning_timer = 0.0;
            self.status.arm_timer = 0.0;
        } else {
            match self.status.state {
                FtsState::Safe => {
                    self.status.state = FtsState::Warning;
                    self.status.warning_timer = 0.0;
                }
                FtsState::Warning => {
                    self.status.warning_timer += dt;
                    if self.status.warning_timer >= self.config.warning_to_arm {
                        self.status.state = FtsState::Arm;
                        self.status.arm_timer = 0.0;
                    }
                }
                FtsState::Arm => {
                    self.status.arm_timer += dt;
                    if self.config.auto_destruct && self.status.arm_timer >= self.config.arm_to_destruct {
                        self.status.state = FtsState::Destruct;
                    }
                }
                FtsState::Destruct => {}
            }
        }

        let after = self.status.state;
        if after != before {
            match after {
                FtsState::Destruct => warn!(%violation, "FTS destruct"),
                _ => info!(from = %before, to = %after, %violation, "FTS state change"),
            }
        }
        self.report(after == FtsState::Destruct && before != FtsState::Destruct)
    }

    fn report(&self, destruct_triggered: bool) -> FtsUpdate {
        FtsUpdate { state: self.status.state, violation: self.status.violation, destruct_triggered }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.1;

    fn nominal(altitude: f64) -> FtsInput {
        FtsInput {
            position: Vector2::new(0.0, -altitude),
            velocity: Vector2::new(0.0, 200.0),
            altitude,
            heading: 0.0,
            launch_site: Vector2::zeros(),
        }
    }

    fn off_course(altitude: f64) -> FtsInput {
        FtsInput { position: Vector2::new(500_000.0, -altitude), ..nominal(altitude) }
    }

    fn run(fts: &mut FlightTermination, input: &FtsInput, seconds: f64) -> Vec<FtsUpdate> {
        let n = (seconds / DT).round() as usize;
        (0..n).map(|_| fts.update(input, DT)).collect()
    }

    #[test]
    fn nominal_flight_stays_safe() {
        let mut fts = FlightTermination::default();
        let updates = run(&mut fts, &nominal(5_000.0), 10.0);
        assert!(updates.iter().all(|u| u.state == FtsState::Safe));
        assert!(fts.status().corridor_fraction.abs() < 1e-12);
    }

    #[test]
    fn persistent_violation_escalates_to_destruct_once() {
        let mut fts = FlightTermination::default();
        let updates = run(&mut fts, &off_course(5_000.0), 8.0);
        assert_eq!(updates[0].state, FtsState::Warning);
        assert_eq!(updates[0].violation, Violation::Corridor);
        assert!(updates.iter().any(|u| u.state == FtsState::Arm));
        assert_eq!(fts.status().state, FtsState::Destruct);
        assert_eq!(updates.iter().filter(|u| u.destruct_triggered).count(), 1);
    }

    #[test]
    fn clearing_violation_retreats_to_safe() {
        let mut fts = FlightTermination::default();
        run(&mut fts, &off_course(5_000.0), 4.0);
        assert_eq!(fts.status().state, FtsState::Arm);
        fts.update(&nominal(5_000.0), DT);
        assert_eq!(fts.status().state, FtsState::Safe);
        assert_eq!(fts.status().arm_timer, 0.0);
    }

    #[test]
    fn no_auto_destruct_holds_in_arm() {
        let mut fts = FlightTermination::new(FtsConfig { auto_destruct: false, ..Default::default() });
        run(&mut fts, &off_course(5_000.0), 30.0);
        assert_eq!(fts.status().state, FtsState::Arm);
    }

    #[test]
    fn floor_forces_safe_but_destruct_is_sticky() {
        let mut fts = FlightTermination::default();
        run(&mut fts, &off_course(5_000.0), 4.0);
        let s = fts.update(&off_course(5.0), DT);
        assert_eq!(s.state, FtsState::Safe);
        assert_eq!(fts.status().warning_timer, 0.0);
        assert_eq!(fts.status().arm_timer, 0.0);

        run(&mut fts, &off_course(5_000.0), 8.0);
        assert_eq!(fts.status().state, FtsState::Destruct);
        let s = fts.update(&off_course(5.0), DT);
        assert_eq!(s.state, FtsState::Destruct);
    }

    #[test]
    fn tumble_outranks_corridor() {
        let mut fts = FlightTermination::default();
        let mut input = off_course(5_000.0);
        fts.update(&input, DT);
        input.heading = 1.0; // 10 rad/s
        let u = fts.update(&input, DT);
        assert_eq!(u.violation, Violation::Tumble);
    }

    #[test]
    fn shallow_low_flight_is_a_trajectory_violation() {
        let mut fts = FlightTermination::default();
        let input = FtsInput { velocity: Vector2::new(300.0, 20.0), ..nominal(2_000.0) };
        assert_eq!(fts.update(&input, DT).violation, Violation::Trajectory);
        let high = FtsInput { velocity: Vector2::new(300.0, 20.0), ..nominal(40_000.0) };
        assert_eq!(fts.update(&high, DT).violation, Violation::None);
    }

    #[test]
    fn zero_dt_gives_zero_rate() {
        let mut fts = FlightTermination::default();
        let mut input = nominal(5_000.0);
        fts.update(&input, DT);
        input.heading = 2.0;
        assert_eq!(fts.update(&input, 0.0).violation, Violation::None);
        assert_eq!(fts.update(&input, -1.0).violation, Violation::None);
    }

    #[test]
    fn manual_destruct_requires_arm() {
        let mut fts = FlightTermination::default();
        assert_eq!(fts.manual_destruct(), DestructOutcome::Denied);
        assert_eq!(fts.status().state, FtsState::Safe);
        fts.arm();
        assert_eq!(fts.manual_destruct(), DestructOutcome::Executed);
        assert_eq!(fts.status().state, FtsState::Destruct);
        fts.reset();
        assert_eq!(fts.status(), FtsStatus::default());
    }
}
