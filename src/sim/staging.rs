use nalgebra::Vector2;
use tracing::info;

use crate::vehicle::{EngineState, Kind, Vessel, VesselId};
use super::event::EventKind;

/// Residual fuel fraction left in a dropped booster.
pub const BOOSTER_RESIDUAL_FUEL: f64 = 0.05;

const UPPER_OFFSET: f64 = 60.0;       // m above the booster
const UPPER_KICK: f64 = 2.0;          // m/s extra climb
const FAIRING_GAP: f64 = 1.5;         // m outside the stage wall
const FAIRING_RISE: f64 = 8.0;        // m above the stage centre
const FAIRING_PUSH: f64 = 6.0;        // m/s outward
const FAIRING_TILT: f64 = 0.35;       // rad
const PAYLOAD_OFFSET: f64 = 20.0;     // m above the upper stage
const PAYLOAD_KICK: f64 = 1.0;        // m/s extra climb

/// Hands out vessel ids. Ids are never reused within one simulation.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn next_id(&mut self) -> VesselId {
        self.next += 1;
        VesselId(self.next)
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Result of one staging transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Separation {
    pub event: EventKind,
    /// Index of the tracked vessel after the transition.
    pub tracked: usize,
}

fn spawn_from(parent: &Vessel, kind: Kind, id: VesselId, offset: Vector2<f64>, dv: Vector2<f64>) -> Vessel {
    let mut child = Vessel::new(id, kind, parent.pos + offset, parent.ground_y());
    child.vel = parent.vel + dv;
    child.angle = parent.angle;
    child.angular_rate = parent.angular_rate;
    child.on_ground = parent.on_ground;
    child
}

// ---------------------------------------------------------------------------
// Staging state machine
// ---------------------------------------------------------------------------

/// Run the staging transition for the tracked vessel.
///
/// The transition is chosen by the tracked vessel's composition. Returns
/// `None` for kinds with nothing left to separate.
pub fn stage(vessels: &mut Vec<Vessel>, tracked: usize, ids: &mut IdAllocator) -> Option<Separation> {
    let kind = vessels.get(tracked)?.kind;
    match kind {
        Kind::FullStack => {
            let parent = vessels.remove(tracked);

            let mut booster = spawn_from(&parent, Kind::Booster, ids.next_id(), Vector2::zeros(), Vector2::zeros());
            booster.fuel = BOOSTER_RESIDUAL_FUEL;
            booster.throttle = parent.throttle;
            booster.engine = parent.engine;

            let mut upper = spawn_from(
                &parent,
                Kind::UpperStage,
                ids.next_id(),
                Vector2::new(0.0, -UPPER_OFFSET),
                Vector2::new(0.0, UPPER_KICK),
            );
            upper.throttle = 1.0;
            upper.engine = EngineState::Running;
            upper.on_ground = false;

            info!(booster = booster.id.0, upper = upper.id.0, "stage one separation");
            vessels.push(booster);
            vessels.push(upper);
            Some(Separation { event: EventKind::StagingS1, tracked: vessels.len() - 1 })
        }
        Kind::UpperStage if !vessels[tracked].fairings_deployed => {
            let parent = &vessels[tracked];
            let side = parent.spec.width * 0.5 + FAIRING_GAP;
            let rise = parent.spec.height * 0.5 + FAIRING_RISE;

            let mut halves = Vec::with_capacity(2);
            for dir in [-1.0, 1.0] {
                let mut half = spawn_from(
                    parent,
                    Kind::Fairing,
                    ids.next_id(),
                    Vector2::new(dir * side, -rise),
                    Vector2::new(dir * FAIRING_PUSH, 0.0),
                );
                half.angle = parent.angle + dir * FAIRING_TILT;
                halves.push(half);
            }

            vessels[tracked].fairings_deployed = true;
            info!(stage = vessels[tracked].id.0, "fairing separation");
            vessels.extend(halves);
            Some(Separation { event: EventKind::FairingSep, tracked })
        }
        Kind::UpperStage => {
            let payload = spawn_from(
                &vessels[tracked],
                Kind::Payload,
                ids.next_id(),
                Vector2::new(0.0, -PAYLOAD_OFFSET),
                Vector2::new(0.0, PAYLOAD_KICK),
            );

            let spent = &mut vessels[tracked];
            spent.active = false;
            spent.throttle = 0.0;
            spent.engine = EngineState::Off;

            info!(payload = payload.id.0, "payload separation");
            vessels.push(payload);
            Some(Separation { event: EventKind::PayloadSep, tracked: vessels.len() - 1 })
        }
        Kind::Booster | Kind::Fairing | Kind::Payload => None,
    }
}
