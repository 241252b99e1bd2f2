//! Frame-rate meter for periodic console reporting.
//!
//! Counts completed cycles and, every `report_every` frames, yields the
//! average rate since the last report provided at least `min_window`
//! has elapsed. Short windows are skipped so a burst of no-op cycles does
//! not produce a wildly inflated figure.

use std::time::{Duration, Instant};

/// Windowed frames-per-second meter.
pub struct FpsMeter {
    /// Start of the current measurement window.
    window_start: Instant,
    /// Frames counted in the current window.
    window_frames: u64,
    /// Frames counted since creation.
    total_frames: u64,
    report_every: u64,
    min_window: Duration,
}

impl FpsMeter {
    /// Report every 30 frames, over windows of at least 500 ms.
    pub fn new() -> Self {
        Self::with_interval(30, Duration::from_millis(500))
    }

    pub fn with_interval(report_every: u64, min_window: Duration) -> Self {
        Self::starting_at(Instant::now(), report_every, min_window)
    }

    /// Meter whose first window opens at `start` (useful for testing).
    pub fn starting_at(start: Instant, report_every: u64, min_window: Duration) -> Self {
        Self {
            window_start: start,
            window_frames: 0,
            total_frames: 0,
            report_every: report_every.max(1),
            min_window,
        }
    }

    /// Count one frame completed now.
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    /// Count one frame completed at `now`; returns the rate when a report
    /// is due and starts a new window.
    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.window_frames += 1;
        self.total_frames += 1;

        if self.window_frames % self.report_every != 0 {
            return None;
        }
        let elapsed = now.duration_since(self.window_start);
        if elapsed < self.min_window || elapsed.is_zero() {
            return None;
        }

        let fps = self.window_frames as f64 / elapsed.as_secs_f64();
        self.window_frames = 0;
        self.window_start = now;
        Some(fps)
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_on_interval_boundary() {
        let t0 = Instant::now();
        let mut fps = FpsMeter::starting_at(t0, 3, Duration::ZERO);
        assert_eq!(fps.tick_at(t0 + Duration::from_millis(100)), None);
        assert_eq!(fps.tick_at(t0 + Duration::from_millis(200)), None);
        let rate = fps.tick_at(t0 + Duration::from_millis(300)).unwrap();
        assert!((rate - 10.0).abs() < 1e-6, "rate = {rate}");
    }

    #[test]
    fn short_window_defers_report() {
        let t0 = Instant::now();
        let mut fps = FpsMeter::starting_at(t0, 2, Duration::from_millis(500));
        fps.tick_at(t0 + Duration::from_millis(10));
        // Boundary reached but window too short.
        assert_eq!(fps.tick_at(t0 + Duration::from_millis(20)), None);
        fps.tick_at(t0 + Duration::from_millis(300));
        // 4 frames over 600 ms.
        let rate = fps.tick_at(t0 + Duration::from_millis(600)).unwrap();
        assert!((rate - 4.0 / 0.6).abs() < 1e-6, "rate = {rate}");
    }

    #[test]
    fn window_resets_after_report() {
        let t0 = Instant::now();
        let mut fps = FpsMeter::starting_at(t0, 1, Duration::ZERO);
        assert!(fps.tick_at(t0 + Duration::from_secs(1)).is_some());
        let rate = fps.tick_at(t0 + Duration::from_secs(3)).unwrap();
        assert!((rate - 0.5).abs() < 1e-6);
        assert_eq!(fps.total_frames(), 2);
    }
}
