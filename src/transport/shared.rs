use std::sync::atomic::{AtomicU64, Ordering};

use super::snapshot::{Snapshot, VesselRecord, HEADER_SLOTS, LAYOUT_VERSION, RECORD_SLOTS};

/// Fixed-layout region the simulation writes once per tick and readers poll
/// without locks.
///
/// Every slot is an `f64` stored as bits. The writer stores the header, then
/// the records in index order, then bumps the generation counter. Readers may
/// observe a torn mix of two ticks and are expected to re-read next frame.
#[derive(Debug)]
pub struct SharedRegion {
    generation: AtomicU64,
    header: Box<[AtomicU64]>,
    records: Box<[AtomicU64]>,
    capacity: usize,
}

fn slots(n: usize) -> Box<[AtomicU64]> {
    (0..n).map(|_| AtomicU64::new(0)).collect()
}

impl SharedRegion {
    /// Region with room for `capacity` vessel records.
    pub fn new(capacity: usize) -> Self {
        Self {
            generation: AtomicU64::new(0),
            header: slots(HEADER_SLOTS),
            records: slots(capacity * RECORD_SLOTS),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of completed writes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Publish a snapshot. Vessels beyond capacity are not written and the
    /// header count is capped to match.
    pub fn write(&self, snapshot: &Snapshot) {
        let count = snapshot.vessels.len().min(self.capacity);
        let mut header = snapshot.header_slots();
        header[2] = count as f64;
        for (slot, value) in self.header.iter().zip(header) {
            slot.store(value.to_bits(), Ordering::Relaxed);
        }
        for (i, record) in snapshot.vessels.iter().take(count).enumerate() {
            let base = i * RECORD_SLOTS;
            for (j, value) in record.to_slots().into_iter().enumerate() {
                self.records[base + j].store(value.to_bits(), Ordering::Relaxed);
            }
        }
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Opportunistic read. Undecodable records are skipped; a header from
    /// another layout version (or none yet) reads as an empty snapshot.
    pub fn read(&self) -> Snapshot {
        let mut header = [0.0; HEADER_SLOTS];
        for (value, slot) in header.iter_mut().zip(self.header.iter()) {
            *value = f64::from_bits(slot.load(Ordering::Relaxed));
        }
        if header[0] != f64::from(LAYOUT_VERSION) {
            return Snapshot::default();
        }
        let mut snapshot = Snapshot::from_header_slots(&header);
        let count = (header[2].max(0.0) as usize).min(self.capacity);

        for i in 0..count {
            let base = i * RECORD_SLOTS;
            let mut raw = [0.0; RECORD_SLOTS];
            for (j, value) in raw.iter_mut().enumerate() {
                *value = f64::from_bits(self.records[base + j].load(Ordering::Relaxed));
            }
            if let Some(record) = VesselRecord::from_slots(&raw) {
                snapshot.vessels.push(record);
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{Kind, Vessel, VesselId};
    use nalgebra::Vector2;

    fn snapshot(n: usize) -> Snapshot {
        let vessels = (0..n)
            .map(|i| {
                let v = Vessel::new(VesselId(i as u64), Kind::Fairing, Vector2::new(i as f64, 0.0), 0.0);
                VesselRecord::from(&v)
            })
            .collect();
        Snapshot { mission_time: 3.0, tracked: 0, vessels, ..Default::default() }
    }

    #[test]
    fn write_then_read() {
        let region = SharedRegion::new(8);
        assert_eq!(region.generation(), 0);
        let snap = snapshot(3);
        region.write(&snap);
        assert_eq!(region.generation(), 1);
        assert_eq!(region.read(), snap);
    }

    #[test]
    fn overflow_is_truncated() {
        let region = SharedRegion::new(2);
        region.write(&snapshot(5));
        let read = region.read();
        assert_eq!(read.vessels.len(), 2);
        assert_eq!(read.vessels[1].x, 1.0);
    }

    #[test]
    fn fresh_region_reads_empty() {
        let region = SharedRegion::new(4);
        assert!(region.read().vessels.is_empty());
    }

    #[test]
    fn foreign_layout_version_reads_empty() {
        let region = SharedRegion::new(4);
        region.write(&snapshot(2));
        region.header[0].store(f64::from(LAYOUT_VERSION + 1).to_bits(), Ordering::Relaxed);
        assert_eq!(region.read(), Snapshot::default());

        region.write(&snapshot(2));
        assert_eq!(region.read().vessels.len(), 2);
    }
}
