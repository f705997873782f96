use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of wall-clock seconds for debouncing.
pub trait WallClock: Send {
    fn now(&self) -> f64;
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

// ---------------------------------------------------------------------------
// Fixed-step accumulator
// ---------------------------------------------------------------------------

/// Turns jittery frame times into whole fixed steps.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    pub fixed_dt: f64,
    pub max_frame_time: f64,
    accumulator: f64,
}

impl FixedTimestep {
    pub fn new(fixed_dt: f64, max_frame_time: f64) -> Self {
        Self { fixed_dt, max_frame_time, accumulator: 0.0 }
    }

    /// Bank `real_elapsed` (clamped) scaled by `time_scale` and return how
    /// many whole steps are now due.
    pub fn accumulate(&mut self, real_elapsed: f64, time_scale: f64) -> usize {
        if !(self.fixed_dt > 0.0) || !self.fixed_dt.is_finite() {
            return 0;
        }
        let frame = if real_elapsed.is_finite() { real_elapsed.clamp(0.0, self.max_frame_time) } else { 0.0 };
        let scale = if time_scale.is_finite() { time_scale.max(0.0) } else { 0.0 };
        self.accumulator += frame * scale;

        // Tolerate rounding so 0.04 + 0.02 - 0.04 still drains one step.
        let steps = ((self.accumulator + 1e-9) / self.fixed_dt).floor();
        self.accumulator = (self.accumulator - steps * self.fixed_dt).max(0.0);
        steps as usize
    }

    pub fn pending(&self) -> f64 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new();
        let view = clock.clone();
        clock.advance(1.5);
        assert_eq!(view.now(), 1.5);
    }

    #[test]
    fn accumulator_drains_whole_steps() {
        let mut ts = FixedTimestep::new(0.02, 0.25);
        assert_eq!(ts.accumulate(0.05, 1.0), 2);
        assert!((ts.pending() - 0.01).abs() < 1e-12);
        assert_eq!(ts.accumulate(0.01, 1.0), 1);
    }

    #[test]
    fn long_frames_are_clamped() {
        let mut ts = FixedTimestep::new(0.02, 0.25);
        assert_eq!(ts.accumulate(5.0, 1.0), 12);
        ts.reset();
        assert_eq!(ts.accumulate(0.1, 4.0), 20);
    }

    #[test]
    fn bad_input_adds_nothing() {
        let mut ts = FixedTimestep::new(0.02, 0.25);
        assert_eq!(ts.accumulate(-1.0, 1.0), 0);
        assert_eq!(ts.accumulate(f64::NAN, 1.0), 0);
        assert_eq!(ts.accumulate(0.1, f64::INFINITY), 0);
        assert_eq!(ts.pending(), 0.0);
    }
}
