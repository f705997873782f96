use serde::Serialize;

use crate::safety::{FtsState, FtsStatus, Violation};
use crate::vehicle::{Kind, Vessel};

/// Bumped whenever the slot layout below changes.
pub const LAYOUT_VERSION: u32 = 1;
pub const HEADER_SLOTS: usize = 13;
pub const RECORD_SLOTS: usize = 21;

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Per-vessel record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VesselRecord {
    pub kind: Kind,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub angle: f64,
    pub throttle: f64,
    pub gimbal: f64,
    pub fuel: f64,
    pub active: bool,
    pub engine: u8,
    pub igniters: u32,
    pub width: f64,
    pub height: f64,
    pub crashed: bool,
    pub skin_temp: f64,
    pub shield: f64,
    pub ablating: bool,
    pub fairings_deployed: bool,
    pub mass: f64,
    pub apogee: f64,
}

impl From<&Vessel> for VesselRecord {
    fn from(v: &Vessel) -> Self {
        Self {
            kind: v.kind,
            x: v.pos.x,
            y: v.pos.y,
            vx: v.vel.x,
            vy: v.vel.y,
            angle: v.angle,
            throttle: v.throttle,
            gimbal: v.gimbal,
            fuel: v.fuel,
            active: v.active,
            engine: v.engine.code(),
            igniters: v.igniters,
            width: v.spec.width,
            height: v.spec.height,
            crashed: v.crashed,
            skin_temp: v.thermal.skin_temp,
            shield: v.thermal.shield,
            ablating: v.thermal.ablating,
            fairings_deployed: v.fairings_deployed,
            mass: v.mass(),
            apogee: v.telemetry.apogee,
        }
    }
}

impl VesselRecord {
    pub fn to_slots(&self) -> [f64; RECORD_SLOTS] {
        [
            f64::from(self.kind.code()),
            self.x,
            self.y,
            self.vx,
            self.vy,
            self.angle,
            self.throttle,
            self.gimbal,
            self.fuel,
            flag(self.active),
            f64::from(self.engine),
            f64::from(self.igniters),
            self.width,
            self.height,
            flag(self.crashed),
            self.skin_temp,
            self.shield,
            flag(self.ablating),
            flag(self.fairings_deployed),
            self.mass,
            self.apogee,
        ]
    }

    /// Decode a record. `None` for an unknown kind tag (torn read).
    pub fn from_slots(s: &[f64; RECORD_SLOTS]) -> Option<Self> {
        let kind = Kind::from_code(s[0] as u8)?;
        Some(Self {
            kind,
            x: s[1],
            y: s[2],
            vx: s[3],
            vy: s[4],
            angle: s[5],
            throttle: s[6],
            gimbal: s[7],
            fuel: s[8],
            active: s[9] != 0.0,
            engine: s[10] as u8,
            igniters: s[11] as u32,
            width: s[12],
            height: s[13],
            crashed: s[14] != 0.0,
            skin_temp: s[15],
            shield: s[16],
            ablating: s[17] != 0.0,
            fairings_deployed: s[18] != 0.0,
            mass: s[19],
            apogee: s[20],
        })
    }
}

// ---------------------------------------------------------------------------
// Whole-world snapshot
// ---------------------------------------------------------------------------

/// State published once per tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub mission_time: f64,
    pub tracked: usize,
    pub wind_x: f64,
    pub wind_y: f64,
    pub density_multiplier: f64,
    pub fts: FtsStatus,
    pub vessels: Vec<VesselRecord>,
}

impl Snapshot {
    pub fn tracked_vessel(&self) -> Option<&VesselRecord> {
        self.vessels.get(self.tracked)
    }

    pub fn header_slots(&self) -> [f64; HEADER_SLOTS] {
        [
            f64::from(LAYOUT_VERSION),
            self.mission_time,
            self.vessels.len() as f64,
            self.tracked as f64,
            self.wind_x,
            self.wind_y,
            self.density_multiplier,
            f64::from(self.fts.state.code()),
            flag(self.fts.armed),
            f64::from(self.fts.violation.code()),
            self.fts.corridor_fraction,
            self.fts.warning_timer,
            self.fts.arm_timer,
        ]
    }

    /// Rebuild the header part from slots; vessels are left empty.
    pub fn from_header_slots(h: &[f64; HEADER_SLOTS]) -> Self {
        let fts_state = match h[7] as u8 {
            1 => FtsState::Warning,
            2 => FtsState::Arm,
            3 => FtsState::Destruct,
            _ => FtsState::Safe,
        };
        let violation = match h[9] as u8 {
            1 => Violation::Tumble,
            2 => Violation::Corridor,
            3 => Violation::Altitude,
            4 => Violation::Trajectory,
            _ => Violation::None,
        };
        Self {
            mission_time: h[1],
            tracked: h[3] as usize,
            wind_x: h[4],
            wind_y: h[5],
            density_multiplier: h[6],
            fts: FtsStatus {
                state: fts_state,
                armed: h[8] != 0.0,
                violation,
                corridor_fraction: h[10],
                warning_timer: h[11],
                arm_timer: h[12],
            },
            vessels: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::VesselId;
    use nalgebra::Vector2;

    #[test]
    fn record_slot_order() {
        let mut v = Vessel::new(VesselId(1), Kind::UpperStage, Vector2::new(10.0, -500.0), 0.0);
        v.vel = Vector2::new(3.0, 4.0);
        v.throttle = 0.5;
        v.fairings_deployed = true;
        let slots = VesselRecord::from(&v).to_slots();
        assert_eq!(slots[0], 2.0);
        assert_eq!(&slots[1..5], &[10.0, -500.0, 3.0, 4.0]);
        assert_eq!(slots[6], 0.5);
        assert_eq!(slots[9], 1.0);
        assert_eq!(slots[11], 3.0);
        assert_eq!(slots[18], 1.0);
        assert_eq!(slots[19], v.mass());
    }

    #[test]
    fn unknown_kind_tag_is_rejected() {
        let mut slots = [0.0; RECORD_SLOTS];
        slots[0] = 9.0;
        assert!(VesselRecord::from_slots(&slots).is_none());
    }

    #[test]
    fn header_carries_layout_version() {
        let snap = Snapshot { mission_time: 12.5, ..Default::default() };
        let h = snap.header_slots();
        assert_eq!(h[0], 1.0);
        assert_eq!(Snapshot::from_header_slots(&h).mission_time, 12.5);
    }
}
