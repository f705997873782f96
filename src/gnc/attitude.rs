use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::vehicle::Vessel;
use super::pid::Pid;

/// Stability augmentation mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum SasMode {
    #[default]
    Off,
    Stability,
    Prograde,
    Retrograde,
}

/// Wrap an angle into [-pi, pi].
pub fn wrap_angle(a: f64) -> f64 {
    if !a.is_finite() {
        return 0.0;
    }
    let mut w = (a + PI) % (2.0 * PI);
    if w < 0.0 {
        w += 2.0 * PI;
    }
    w - PI
}

/// Convert a pitch above the horizon into a heading from vertical.
pub fn pitch_to_heading(pitch: f64) -> f64 {
    FRAC_PI_2 - pitch
}

// ---------------------------------------------------------------------------
// Attitude controller: heading hold via gimbal, PD with rate damping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AttitudeController {
    pub heading_pid: Pid,
    pub rate_gain: f64,
    mode: SasMode,
    hold: Option<f64>,
}

impl AttitudeController {
    pub fn new() -> Self {
        Self {
            heading_pid: Pid::new(0.4, 0.02, 0.0).with_integral_limit(0.5),
            rate_gain: 0.8,
            mode: SasMode::Off,
            hold: None,
        }
    }

    pub fn mode(&self) -> SasMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SasMode) {
        if mode != self.mode {
            self.mode = mode;
            self.hold = None;
            self.heading_pid.reset();
        }
    }

    /// Gimbal command that steers toward a pitch above the horizon.
    pub fn track_pitch(&mut self, vessel: &Vessel, pitch: f64, dt: f64) -> f64 {
        self.hold = None;
        self.steer(pitch_to_heading(pitch), vessel, dt)
    }

    /// Gimbal command for the current SAS mode. Returns 0 with SAS off.
    pub fn stabilize(&mut self, vessel: &Vessel, dt: f64) -> f64 {
        let target = match self.mode {
            SasMode::Off => return 0.0,
            SasMode::Stability => *self.hold.get_or_insert(vessel.angle),
            SasMode::Prograde | SasMode::Retrograde => {
                if vessel.vel.norm() < 1.0 {
                    *self.hold.get_or_insert(vessel.angle)
                } else {
                    let prograde = vessel.vel.x.atan2(vessel.vel.y);
                    if self.mode == SasMode::Prograde { prograde } else { prograde + PI }
                }
            }
        };
        self.steer(target, vessel, dt)
    }

    /// Forget the captured hold heading (manual steering took over).
    pub fn release_hold(&mut self) {
        self.hold = None;
    }

    fn steer(&mut self, target_heading: f64, vessel: &Vessel, dt: f64) -> f64 {
        let error = wrap_angle(target_heading - vessel.angle);
        self.heading_pid.update(error, dt) - self.rate_gain * vessel.angular_rate
    }

    pub fn reset(&mut self) {
        self.heading_pid.reset();
        self.hold = None;
        self.mode = SasMode::Off;
    }
}

impl Default for AttitudeController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{Kind, VesselId};
    use nalgebra::Vector2;

    fn vessel() -> Vessel {
        Vessel::new(VesselId(7), Kind::UpperStage, Vector2::new(0.0, -5_000.0), 0.0)
    }

    #[test]
    fn wrap_stays_in_range() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-9 || (wrap_angle(3.0 * PI) + PI).abs() < 1e-9);
        assert!((wrap_angle(-0.5) + 0.5).abs() < 1e-12);
        assert!((wrap_angle(2.0 * PI + 0.25) - 0.25).abs() < 1e-9);
        assert_eq!(wrap_angle(f64::NAN), 0.0);
    }

    #[test]
    fn pitch_eighty_is_ten_degrees_from_vertical() {
        let heading = pitch_to_heading(80.0_f64.to_radians());
        assert!((heading - 10.0_f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn pitch_over_commands_positive_gimbal() {
        let mut ctl = AttitudeController::new();
        let v = vessel();
        let g = ctl.track_pitch(&v, 70.0_f64.to_radians(), 0.02);
        assert!(g > 0.0);
    }

    #[test]
    fn sas_off_is_neutral() {
        let mut ctl = AttitudeController::new();
        assert_eq!(ctl.stabilize(&vessel(), 0.02), 0.0);
    }

    #[test]
    fn stability_holds_captured_heading() {
        let mut ctl = AttitudeController::new();
        ctl.set_mode(SasMode::Stability);
        let mut v = vessel();
        v.angle = 0.2;
        assert!(ctl.stabilize(&v, 0.02).abs() < 1e-9);
        v.angle = 0.3;
        assert!(ctl.stabilize(&v, 0.02) < 0.0, "should steer back toward 0.2");
    }

    #[test]
    fn retrograde_points_against_velocity() {
        let mut ctl = AttitudeController::new();
        ctl.set_mode(SasMode::Retrograde);
        let mut v = vessel();
        v.vel = Vector2::new(0.0, 100.0);
        v.angle = PI - 0.1;
        assert!(ctl.stabilize(&v, 0.02) > 0.0);
    }

    #[test]
    fn sas_mode_parses_script_tokens() {
        assert_eq!("PROGRADE".parse::<SasMode>().unwrap(), SasMode::Prograde);
        assert_eq!(SasMode::Stability.to_string(), "STABILITY");
    }
}
