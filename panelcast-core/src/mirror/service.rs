//! Per-cycle mirroring orchestrator.
//!
//! Drives one cycle after another:
//!
//! 1. Check the [`StopHandle`]; leave the loop if it was cancelled.
//! 2. [`FrameSource::capture`] a frame.
//! 3. Apply the [`Interlace`] filter, if enabled.
//! 4. [`FrameDiff::compute`] against the cached previous frame.
//! 5. Transmit nothing, the full frame, or the packed changed region.
//!    If the region buffer cannot be allocated the full frame is sent.
//! 6. [`FrameCache::commit`] the new frame.
//! 7. Count the frame for FPS reporting and sleep for the pacing delay.
//!
//! A capture or transmit failure ends the run with the error. The cache is
//! only committed once the transmit for that cycle succeeded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::PanelError;
use crate::mirror::cache::FrameCache;
use crate::mirror::diff::{FrameDiff, Thresholds};
use crate::mirror::fps::FpsMeter;
use crate::mirror::interlace::Interlace;
use crate::mirror::region::{self, RegionBuffer};
use crate::mirror::transport::{FrameSource, PanelSink};
use crate::mirror::types::{BoundingRect, Frame, Geometry, UpdateDecision};

/// Packs the changed rectangle of a frame for a partial transmit.
type Extractor = fn(&Frame, BoundingRect) -> Result<RegionBuffer, PanelError>;

// ── UpdateMode ───────────────────────────────────────────────────

/// How frames are pushed to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Diff every frame and send only what changed.
    #[default]
    Partial,
    /// Send every captured frame in full without diffing.
    Constant,
}

// ── MirrorConfig ─────────────────────────────────────────────────

/// Configuration for [`MirrorService`], fixed for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Frame dimensions; captured frames must match.
    pub geometry: Geometry,
    pub mode: UpdateMode,
    pub thresholds: Thresholds,
    /// Row blanking; `None` disables it.
    pub interlace: Option<Interlace>,
    /// Sleep between cycles.
    pub pace: Duration,
    /// Log the frame rate periodically.
    pub report_fps: bool,
    /// Frames between FPS reports.
    pub fps_report_every: u64,
    /// Shortest window an FPS report may cover.
    pub fps_min_window: Duration,
    /// Paint the panel black before the first cycle so it matches the
    /// zeroed cache.
    pub clear_on_start: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            geometry: Geometry::new(320, 170),
            mode: UpdateMode::Partial,
            thresholds: Thresholds::default(),
            interlace: None,
            pace: Duration::from_millis(2),
            report_fps: true,
            fps_report_every: 30,
            fps_min_window: Duration::from_millis(500),
            clear_on_start: true,
        }
    }
}

impl MirrorConfig {
    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), PanelError> {
        if self.geometry.is_empty() {
            return Err(PanelError::InvalidConfig(format!(
                "frame size {}x{} has no pixels",
                self.geometry.width, self.geometry.height
            )));
        }
        let pct = self.thresholds.change_percent;
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            return Err(PanelError::InvalidConfig(format!(
                "change threshold {pct} is not a percentage"
            )));
        }
        Ok(())
    }
}

// ── StopHandle ───────────────────────────────────────────────────

/// Cooperative cancellation token.
///
/// Cloneable and safe to cancel from a signal task; the service polls it
/// once per cycle, so an in-flight cycle always completes.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    cancelled: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the loop to stop at the next cycle boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ── Reports ──────────────────────────────────────────────────────

/// Outcome of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    /// Decision taken for this cycle (`Full` in constant mode).
    pub decision: UpdateDecision,
    /// Changed pixel count; `None` when the diff was skipped.
    pub changed_pixels: Option<usize>,
    pub changed_percent: Option<f64>,
    /// A partial update was sent as a full frame instead.
    pub fell_back: bool,
    /// Pixels pushed over the bus.
    pub pixels_sent: usize,
}

/// Running totals over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub cycles: u64,
    pub full_updates: u64,
    pub partial_updates: u64,
    pub skipped: u64,
    pub fallbacks: u64,
    pub pixels_sent: u64,
}

impl MirrorStats {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.pixels_sent += report.pixels_sent as u64;
        match report.decision {
            UpdateDecision::NoOp => self.skipped += 1,
            UpdateDecision::Full => self.full_updates += 1,
            UpdateDecision::Partial(_) if report.fell_back => {
                self.fallbacks += 1;
                self.full_updates += 1;
            }
            UpdateDecision::Partial(_) => self.partial_updates += 1,
        }
    }
}

// ── MirrorService ────────────────────────────────────────────────

/// Owns the capture source, the panel and the frame cache for one run.
///
/// # Lifetime
///
/// Call [`run`](Self::run) to start the loop. It returns when the
/// [`StopHandle`] is cancelled or a fatal error occurs.
pub struct MirrorService<S, P> {
    source: S,
    panel: P,
    cache: FrameCache,
    diff: FrameDiff,
    fps: FpsMeter,
    stats: MirrorStats,
    stop: StopHandle,
    config: MirrorConfig,
    extract: Extractor,
}

impl<S: FrameSource, P: PanelSink> MirrorService<S, P> {
    /// Validate `config` and allocate the frame cache.
    pub fn new(source: S, panel: P, config: MirrorConfig) -> Result<Self, PanelError> {
        config.validate()?;
        let cache = FrameCache::new(config.geometry)?;
        let diff = FrameDiff::new(config.thresholds).with_interlace(config.interlace);
        let fps = FpsMeter::with_interval(config.fps_report_every, config.fps_min_window);

        Ok(Self {
            source,
            panel,
            cache,
            diff,
            fps,
            stats: MirrorStats::default(),
            stop: StopHandle::new(),
            config,
            extract: region::extract,
        })
    }

    /// Use an existing token, e.g. one already wired to a signal handler.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// A cloneable handle that stops the loop from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stats(&self) -> MirrorStats {
        self.stats
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Give back the collaborators so the caller can close them.
    pub fn into_parts(self) -> (S, P) {
        (self.source, self.panel)
    }

    /// Paint the panel with the cached (initially black) frame.
    pub fn clear_panel(&mut self) -> Result<(), PanelError> {
        self.panel.transmit_full(self.cache.previous())
    }

    /// Run cycles until cancelled.
    pub async fn run(&mut self) -> Result<MirrorStats, PanelError> {
        let g = self.config.geometry;
        info!("mirroring {}x{} in {:?} mode", g.width, g.height, self.config.mode);
        match self.config.interlace {
            Some(il) => info!("interlacing: every {} lines", il.period()),
            None => info!("interlacing: disabled"),
        }

        if self.config.clear_on_start && !self.stop.is_cancelled() {
            if let Err(e) = self.clear_panel() {
                error!("failed to clear panel: {e}");
                return Err(e);
            }
        }

        while !self.stop.is_cancelled() {
            if let Err(e) = self.step() {
                error!("mirror stopped after {} cycles: {e}", self.stats.cycles);
                return Err(e);
            }

            if self.config.report_fps {
                if let Some(fps) = self.fps.tick() {
                    info!("FPS: {fps:.1} (total: {})", self.fps.total_frames());
                }
            }

            tokio::time::sleep(self.config.pace).await;
        }

        info!("mirror stopped after {} cycles", self.stats.cycles);
        Ok(self.stats)
    }

    /// Run exactly one capture → diff → transmit → commit cycle.
    pub fn step(&mut self) -> Result<CycleReport, PanelError> {
        let frame = self.source.capture()?;
        let g = self.config.geometry;
        if frame.geometry() != g {
            let got = frame.geometry();
            return Err(PanelError::Capture(format!(
                "captured {}x{} frame, expected {}x{}",
                got.width, got.height, g.width, g.height
            )));
        }

        let frame = match self.config.interlace {
            Some(il) => il.apply(frame),
            None => frame,
        };

        let (decision, changed_pixels, changed_percent) = match self.config.mode {
            UpdateMode::Constant => (UpdateDecision::Full, None, None),
            UpdateMode::Partial => {
                let delta = self.diff.compute(&frame, self.cache.previous())?;
                (
                    delta.decision,
                    Some(delta.changed_pixels),
                    Some(delta.changed_percent),
                )
            }
        };

        let (fell_back, pixels_sent) = self.transmit(&frame, decision)?;
        self.cache.commit(&frame)?;

        let report = CycleReport {
            decision,
            changed_pixels,
            changed_percent,
            fell_back,
            pixels_sent,
        };
        self.stats.record(&report);
        Ok(report)
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Returns `(fell_back, pixels_sent)`.
    fn transmit(
        &mut self,
        frame: &Frame,
        decision: UpdateDecision,
    ) -> Result<(bool, usize), PanelError> {
        match decision {
            UpdateDecision::NoOp => Ok((false, 0)),
            UpdateDecision::Full => {
                self.panel.transmit_full(frame)?;
                debug!("full update");
                Ok((false, frame.pixels().len()))
            }
            UpdateDecision::Partial(rect) => match (self.extract)(frame, rect) {
                Ok(region) => {
                    self.panel.transmit_region(&region)?;
                    debug!(
                        "partial update: region {},{} to {},{} ({} pixels)",
                        rect.min_x,
                        rect.min_y,
                        rect.max_x,
                        rect.max_y,
                        region.pixels().len()
                    );
                    Ok((false, region.pixels().len()))
                }
                Err(PanelError::Allocation { bytes }) => {
                    warn!("region buffer of {bytes} bytes unavailable; sending full frame");
                    self.panel.transmit_full(frame)?;
                    Ok((true, frame.pixels().len()))
                }
                Err(e) => Err(e),
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::transport::MemoryPanel;
    use std::collections::VecDeque;

    const G: Geometry = Geometry::new(64, 32);

    /// Yields queued frames; cancels `stop` when handing out the last one.
    struct Script {
        frames: VecDeque<Frame>,
        stop: Option<StopHandle>,
    }

    impl Script {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames: frames.into(),
                stop: None,
            }
        }
    }

    impl FrameSource for Script {
        fn capture(&mut self) -> Result<Frame, PanelError> {
            let frame = self
                .frames
                .pop_front()
                .ok_or_else(|| PanelError::Capture("script exhausted".into()))?;
            if self.frames.is_empty() {
                if let Some(stop) = &self.stop {
                    stop.cancel();
                }
            }
            Ok(frame)
        }
    }

    fn config() -> MirrorConfig {
        MirrorConfig {
            geometry: G,
            pace: Duration::ZERO,
            report_fps: false,
            ..MirrorConfig::default()
        }
    }

    fn service(frames: Vec<Frame>, config: MirrorConfig) -> MirrorService<Script, MemoryPanel> {
        let panel = MemoryPanel::new(config.geometry).unwrap();
        MirrorService::new(Script::new(frames), panel, config).unwrap()
    }

    fn with_block(x0: u32, y0: u32, size: u32, value: u16) -> Frame {
        let mut f = Frame::zeroed(G).unwrap();
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                f.set(x, y, value).unwrap();
            }
        }
        f
    }

    #[test]
    fn black_frame_on_fresh_cache_is_noop() {
        let mut svc = service(vec![Frame::zeroed(G).unwrap()], config());
        let report = svc.step().unwrap();
        assert_eq!(report.decision, UpdateDecision::NoOp);
        assert_eq!(report.pixels_sent, 0);
        assert_eq!(svc.panel().full_updates(), 0);
        assert_eq!(svc.stats().skipped, 1);
    }

    #[test]
    fn small_block_is_sent_as_region_and_committed() {
        let frame = with_block(10, 10, 4, 0xFFFF);
        let mut svc = service(vec![frame.clone()], config());
        let report = svc.step().unwrap();

        assert_eq!(
            report.decision,
            UpdateDecision::Partial(BoundingRect::new(10, 10, 13, 13))
        );
        assert_eq!(report.changed_pixels, Some(16));
        assert_eq!(report.pixels_sent, 16);
        assert_eq!(svc.panel().region_updates(), 1);
        assert_eq!(svc.cache().previous(), &frame);
        assert_eq!(svc.panel().screen(), &frame);
    }

    #[test]
    fn constant_mode_always_sends_full() {
        let frames = vec![Frame::zeroed(G).unwrap(), Frame::zeroed(G).unwrap()];
        let cfg = MirrorConfig {
            mode: UpdateMode::Constant,
            ..config()
        };
        let mut svc = service(frames, cfg);
        for _ in 0..2 {
            let report = svc.step().unwrap();
            assert_eq!(report.decision, UpdateDecision::Full);
            assert_eq!(report.changed_pixels, None);
        }
        assert_eq!(svc.panel().full_updates(), 2);
        assert_eq!(svc.stats().full_updates, 2);
    }

    #[test]
    fn wrong_capture_size_is_capture_error() {
        let odd = Frame::zeroed(Geometry::new(32, 64)).unwrap();
        let mut svc = service(vec![odd], config());
        assert!(matches!(svc.step(), Err(PanelError::Capture(_))));
        assert_eq!(svc.stats().cycles, 0);
    }

    #[test]
    fn run_stops_when_cancelled() {
        let frames = vec![
            with_block(0, 0, 8, 1),
            with_block(0, 0, 8, 1),
            with_block(20, 5, 6, 2),
        ];
        let mut svc = service(frames, config());
        let stop = svc.stop_handle();
        svc.source.stop = Some(stop);

        let stats = tokio_test::block_on(svc.run()).unwrap();
        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.partial_updates, 2);
        assert_eq!(stats.skipped, 1);
        // Startup clear.
        assert_eq!(svc.panel().full_updates(), 1);
        assert_eq!(svc.panel().screen(), &with_block(20, 5, 6, 2));
    }

    #[test]
    fn cancelled_before_start_sends_nothing() {
        let mut svc = service(vec![Frame::zeroed(G).unwrap()], config());
        assert!(svc.config().clear_on_start);
        svc.stop_handle().cancel();
        let stats = tokio_test::block_on(svc.run()).unwrap();
        assert_eq!(stats.cycles, 0);
        assert_eq!(svc.panel().full_updates(), 0);
        assert_eq!(svc.panel().pixels_written(), 0);
    }

    #[test]
    fn region_allocation_failure_falls_back_to_full() {
        let frame = with_block(10, 10, 4, 0xFFFF);
        let mut svc = service(vec![frame.clone()], config());
        svc.extract = |_, rect| Err(PanelError::alloc_pixels(rect.pixel_count()));

        let report = svc.step().unwrap();
        assert_eq!(
            report.decision,
            UpdateDecision::Partial(BoundingRect::new(10, 10, 13, 13))
        );
        assert!(report.fell_back);
        assert_eq!(report.pixels_sent, G.pixel_count());

        let stats = svc.stats();
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.full_updates, 1);
        assert_eq!(stats.partial_updates, 0);

        assert_eq!(svc.panel().full_updates(), 1);
        assert_eq!(svc.panel().region_updates(), 0);
        assert_eq!(svc.panel().screen(), &frame);
        assert_eq!(svc.cache().previous(), &frame);
    }

    #[test]
    fn other_extraction_errors_are_fatal() {
        let frame = with_block(10, 10, 4, 0xFFFF);
        let mut svc = service(vec![frame], config());
        svc.extract = |_, _| Err(PanelError::Other("packing failed".into()));

        assert!(matches!(svc.step(), Err(PanelError::Other(_))));
        assert_eq!(svc.stats().cycles, 0);
        assert_eq!(svc.panel().full_updates(), 0);
        assert_eq!(svc.cache().previous(), &Frame::zeroed(G).unwrap());
    }

    #[test]
    fn config_validation() {
        let mut cfg = config();
        cfg.geometry = Geometry::new(0, 10);
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.thresholds.change_percent = f64::NAN;
        assert!(cfg.validate().is_err());

        assert!(config().validate().is_ok());
    }

    #[test]
    fn stop_handle_is_shared() {
        let a = StopHandle::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }
}
