//! Daemon wiring.
//!
//! Opens the configured frame source and panel link, hands them to a
//! [`MirrorService`] and runs it until the stop handle fires or a fatal
//! error occurs. The capture and link handles are closed before the
//! result is reported.

use tracing::info;

use panelcast_core::{
    FrameSource, MemoryPanel, MirrorConfig, MirrorService, MirrorStats, PanelError, PanelSink,
    StopHandle, WindowedPanel,
};

use crate::capture::RawFramebufferSource;
use crate::config::PanelcastConfig;
use crate::link::SerialLink;

// ── Daemon ───────────────────────────────────────────────────────

/// The top-level panelcast process.
pub struct Daemon {
    config: PanelcastConfig,
    dry_run: bool,
    stop: StopHandle,
}

impl Daemon {
    /// With `dry_run` set, updates go to an in-memory panel instead of
    /// the serial link.
    pub fn new(config: PanelcastConfig, dry_run: bool) -> Self {
        Self {
            config,
            dry_run,
            stop: StopHandle::new(),
        }
    }

    /// Handle for stopping the daemon from a signal task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run until stopped.
    pub async fn run(&self) -> Result<MirrorStats, PanelError> {
        let mirror = self.config.to_mirror_config()?;
        let geometry = mirror.geometry;
        let capture = &self.config.capture;

        let source =
            RawFramebufferSource::open(&capture.path, geometry, capture.stride, capture.swap_bytes)?;
        info!(
            "capturing from {} (stride {} bytes)",
            capture.path.display(),
            source.stride()
        );

        if self.dry_run {
            info!("dry run: updates go to an in-memory panel");
            let panel = MemoryPanel::new(geometry)?;
            return self.drive(source, panel, mirror).await;
        }

        let link = SerialLink::open(&self.config.link.path)?;
        info!(
            "panel link on {} (offset col {}, row {})",
            self.config.link.path.display(),
            self.config.panel.col_offset,
            self.config.panel.row_offset
        );
        let panel = WindowedPanel::new(
            link,
            geometry,
            self.config.panel.col_offset,
            self.config.panel.row_offset,
        )?;
        self.drive(source, panel, mirror).await
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn drive<S, P>(
        &self,
        source: S,
        panel: P,
        mirror: MirrorConfig,
    ) -> Result<MirrorStats, PanelError>
    where
        S: FrameSource,
        P: PanelSink,
    {
        let mut service =
            MirrorService::new(source, panel, mirror)?.with_stop_handle(self.stop.clone());
        let result = service.run().await;
        drop(service.into_parts());

        let stats = result?;
        info!(
            "{} cycles: {} full, {} partial, {} skipped, {} fallbacks, {} pixels sent",
            stats.cycles,
            stats.full_updates,
            stats.partial_updates,
            stats.skipped,
            stats.fallbacks,
            stats.pixels_sent
        );
        Ok(stats)
    }
}

// ── Tests ────────────────────────────────────────────────────────
