use serde::Serialize;
use strum_macros::{Display, IntoStaticStr};

use crate::vehicle::VesselId;

// ---------------------------------------------------------------------------
// Simulation events
// ---------------------------------------------------------------------------

/// Discrete occurrences reported to the presentation layer, at most once each.
#[derive(Debug, Clone, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
pub enum EventKind {
    #[strum(serialize = "STAGING_S1")]
    StagingS1,
    #[strum(serialize = "FAIRING_SEP")]
    FairingSep,
    #[strum(serialize = "PAYLOAD_SEP")]
    PayloadSep,
    #[strum(serialize = "ABORT")]
    Abort,
    #[strum(serialize = "FTS_DESTRUCT")]
    FtsDestruct,
    #[strum(serialize = "FAULT_INJECTED")]
    FaultInjected(String),
    #[strum(serialize = "SCRIPT_COMPLETE")]
    ScriptComplete,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimEvent {
    pub time: f64, // mission s
    pub kind: EventKind,
    /// Vessel the event concerns, if any.
    pub vessel: Option<VesselId>,
}

impl SimEvent {
    pub fn new(time: f64, kind: EventKind, vessel: Option<VesselId>) -> Self {
        Self { time, kind, vessel }
    }
}
