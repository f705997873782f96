use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::safety::FtsState;
use crate::sim::SimEvent;
use crate::vehicle::Kind;
use super::csv::{writer_for_path, FlightRow};

/// Headline numbers for one recorded flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSummary {
    pub script: Option<String>,
    pub duration_s: f64,
    pub max_altitude_m: f64,
    pub max_altitude_time_s: f64,
    pub max_speed_ms: f64,
    pub max_skin_temp_k: f64,
    pub final_altitude_m: f64,
    pub final_speed_ms: f64,
    pub final_kind: Kind,
    pub final_fts_state: FtsState,
    pub events: Vec<SimEvent>,
}

impl FlightSummary {
    /// `None` when nothing was recorded.
    pub fn from_rows(rows: &[FlightRow], events: &[SimEvent], script: Option<&str>) -> Option<Self> {
        let first = rows.first()?;
        let last = rows.last()?;
        let peak = rows.iter().fold(first, |best, r| if r.altitude > best.altitude { r } else { best });

        Some(Self {
            script: script.map(str::to_string),
            duration_s: last.time - first.time,
            max_altitude_m: peak.altitude,
            max_altitude_time_s: peak.time,
            max_speed_ms: rows.iter().map(|r| r.speed).fold(0.0_f64, f64::max),
            max_skin_temp_k: rows.iter().map(|r| r.skin_temp).fold(0.0_f64, f64::max),
            final_altitude_m: last.altitude,
            final_speed_ms: last.speed,
            final_kind: last.kind,
            final_fts_state: last.fts_state,
            events: events.to_vec(),
        })
    }
}

pub fn write_summary<W: Write>(writer: &mut W, summary: &FlightSummary) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, summary)?;
    writeln!(writer)
}

/// Write the summary to a file, or stdout for `-`.
pub fn write_summary_file(path: &Path, summary: &FlightSummary) -> io::Result<()> {
    let mut writer = writer_for_path(path)?;
    write_summary(&mut writer, summary)?;
    writer.flush()
}
