use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::safety::FtsState;
use crate::transport::Snapshot;
use crate::vehicle::Kind;

const HEADER: &str = "time,kind,vessels,altitude,x,vx,vy,speed,angle_deg,mass,fuel,throttle,skin_temp,apogee,fts_state,fts_armed";

/// Create a writer for the target path; `-` means stdout.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
    writeln!(writer, "{}", HEADER)
}

/// Tracked-vessel sample taken from one published snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlightRow {
    pub time: f64,
    pub kind: Kind,
    pub vessels: usize,
    pub altitude: f64,
    pub x: f64,
    pub vx: f64,
    pub vy: f64,
    pub speed: f64,
    pub angle: f64,
    pub mass: f64,
    pub fuel: f64,
    pub throttle: f64,
    pub skin_temp: f64,
    pub apogee: f64,
    pub fts_state: FtsState,
    pub fts_armed: bool,
}

impl FlightRow {
    /// `None` when the snapshot has no tracked vessel.
    pub fn from_snapshot(snapshot: &Snapshot, ground_y: f64) -> Option<Self> {
        let v = snapshot.tracked_vessel()?;
        Some(Self {
            time: snapshot.mission_time,
            kind: v.kind,
            vessels: snapshot.vessels.len(),
            altitude: ground_y - v.y,
            x: v.x,
            vx: v.vx,
            vy: v.vy,
            speed: v.vx.hypot(v.vy),
            angle: v.angle,
            mass: v.mass,
            fuel: v.fuel,
            throttle: v.throttle,
            skin_temp: v.skin_temp,
            apogee: v.apogee,
            fts_state: snapshot.fts.state,
            fts_armed: snapshot.fts.armed,
        })
    }

    /// One CSV line in header order.
    pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        writeln!(
            writer,
            "{:.3},{},{},{:.2},{:.2},{:.3},{:.3},{:.3},{:.2},{:.2},{:.4},{:.3},{:.1},{:.1},{},{}",
            self.time,
            self.kind,
            self.vessels,
            self.altitude,
            self.x,
            self.vx,
            self.vy,
            self.speed,
            self.angle.to_degrees(),
            self.mass,
            self.fuel,
            self.throttle,
            self.skin_temp,
            self.apogee,
            self.fts_state,
            self.fts_armed,
        )
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Keeps every `decimation`-th row in memory and optionally streams it.
pub struct FlightRecorder {
    ground_y: f64,
    decimation: usize,
    seen: usize,
    rows: Vec<FlightRow>,
    sink: Option<Box<dyn Write>>,
}

impl FlightRecorder {
    pub fn new(ground_y: f64, decimation: usize) -> Self {
        Self { ground_y, decimation: decimation.max(1), seen: 0, rows: Vec::new(), sink: None }
    }

    /// Stream rows to `writer`; the header is written immediately.
    pub fn with_sink(mut self, mut writer: Box<dyn Write>) -> io::Result<Self> {
        write_header(&mut *writer)?;
        self.sink = Some(writer);
        Ok(self)
    }

    pub fn record(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        let Some(row) = FlightRow::from_snapshot(snapshot, self.ground_y) else {
            return Ok(());
        };
        self.seen += 1;
        if (self.seen - 1) % self.decimation != 0 {
            return Ok(());
        }
        if let Some(sink) = self.sink.as_mut() {
            row.write_to(&mut **sink)?;
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[FlightRow] {
        &self.rows
    }

    pub fn finish(mut self) -> io::Result<Vec<FlightRow>> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::VesselRecord;
    use crate::vehicle::{Vessel, VesselId};
    use nalgebra::Vector2;

    fn snapshot(time: f64, y: f64) -> Snapshot {
        let v = Vessel::new(VesselId(1), Kind::FullStack, Vector2::new(1000.0, y), 1000.0);
        Snapshot { mission_time: time, tracked: 0, vessels: vec![VesselRecord::from(&v)], ..Default::default() }
    }

    #[test]
    fn row_altitude_from_ground_line() {
        let row = FlightRow::from_snapshot(&snapshot(1.0, 400.0), 1000.0).unwrap();
        assert!((row.altitude - 600.0).abs() < 1e-9);
        assert_eq!(row.kind, Kind::FullStack);
    }

    #[test]
    fn empty_snapshot_has_no_row() {
        assert!(FlightRow::from_snapshot(&Snapshot::default(), 1000.0).is_none());
    }

    #[test]
    fn csv_output_has_header_and_rows() {
        let mut buf = Vec::new();
        write_header(&mut buf).unwrap();
        for i in 0..2 {
            let row = FlightRow::from_snapshot(&snapshot(i as f64, 900.0), 1000.0).unwrap();
            row.write_to(&mut buf).unwrap();
        }
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("time,"));
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0.000,FULL_STACK,1,100.00,"));
        assert_eq!(lines[1].split(',').count(), HEADER.split(',').count());
    }

    #[test]
    fn recorder_decimates() {
        let mut rec = FlightRecorder::new(1000.0, 3);
        for i in 0..7 {
            rec.record(&snapshot(i as f64, 900.0)).unwrap();
        }
        let times: Vec<f64> = rec.rows().iter().map(|r| r.time).collect();
        assert_eq!(times, vec![0.0, 3.0, 6.0]);
    }

    #[test]
    fn recorder_streams_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/flight.csv");
        let writer = writer_for_path(&path).unwrap();
        let mut rec = FlightRecorder::new(1000.0, 1).with_sink(writer).unwrap();
        rec.record(&snapshot(0.0, 900.0)).unwrap();
        rec.record(&snapshot(0.5, 800.0)).unwrap();
        let rows = rec.finish().unwrap();
        assert_eq!(rows.len(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
