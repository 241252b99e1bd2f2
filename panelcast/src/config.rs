//! Configuration for the panelcast daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use panelcast_core::{
    Geometry, Interlace, MirrorConfig, PanelError, Thresholds, UpdateMode, check_window,
};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelcastConfig {
    /// Panel geometry and addressing.
    pub panel: PanelConfig,
    /// Update decision tuning.
    pub update: UpdateConfig,
    /// Row blanking.
    pub interlace: InterlaceConfig,
    /// Loop pacing and FPS reporting.
    pub timing: TimingConfig,
    /// Frame source.
    pub capture: CaptureConfig,
    /// Serial link to the panel controller.
    pub link: LinkConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Panel geometry and addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in pixels.
    pub height: u32,
    /// Column offset of the visible area in controller RAM.
    pub col_offset: u16,
    /// Row offset of the visible area in controller RAM.
    pub row_offset: u16,
    /// Paint the panel black at startup.
    pub clear_on_start: bool,
}

/// Update decision tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// "partial" (diff and send changed region) or "constant" (always full).
    pub mode: String,
    /// Percentage of changed pixels above which the full frame is sent.
    pub change_threshold: f64,
    /// A partial update needs more changed pixels than this.
    pub min_update_region: usize,
}

/// Row blanking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterlaceConfig {
    pub enabled: bool,
    /// Every Nth line is black (2 = every other line).
    pub every: u32,
}

/// Loop pacing and FPS reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Sleep between cycles in milliseconds.
    pub pace_ms: u64,
    /// Log the frame rate.
    pub show_fps: bool,
    /// Frames between FPS reports.
    pub fps_report_frames: u64,
    /// Minimum FPS report window in milliseconds.
    pub fps_min_window_ms: u64,
}

/// Frame source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Framebuffer device or raw image file.
    pub path: PathBuf,
    /// Bytes per source row; 0 means `width * 2`.
    pub stride: usize,
    /// Swap the two bytes of every pixel after reading.
    pub swap_bytes: bool,
}

/// Serial link to the panel controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial device (or any writable file).
    pub path: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 170,
            col_offset: 0,
            row_offset: 35,
            clear_on_start: true,
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            mode: "partial".into(),
            change_threshold: 5.0,
            min_update_region: 10,
        }
    }
}

impl Default for InterlaceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            every: Interlace::DEFAULT_PERIOD,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pace_ms: 2,
            show_fps: true,
            fps_report_frames: 30,
            fps_min_window_ms: 500,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/fb0"),
            stride: 0,
            swap_bytes: false,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/ttyACM0"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl PanelcastConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read or parsed is an error, never silently replaced.
    pub fn load(path: &Path) -> Result<Self, PanelError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&contents)
            .map_err(|e| PanelError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.panel.width, self.panel.height)
    }

    /// Parse the update mode string.
    pub fn update_mode(&self) -> Result<UpdateMode, PanelError> {
        match self.update.mode.to_ascii_lowercase().as_str() {
            "partial" => Ok(UpdateMode::Partial),
            "constant" | "full" => Ok(UpdateMode::Constant),
            other => Err(PanelError::InvalidConfig(format!(
                "unknown update mode {other:?}"
            ))),
        }
    }

    /// Convert into the core's `MirrorConfig`.
    pub fn to_mirror_config(&self) -> Result<MirrorConfig, PanelError> {
        let interlace = if self.interlace.enabled {
            Some(Interlace::new(self.interlace.every)?)
        } else {
            None
        };
        check_window(
            self.geometry(),
            self.panel.col_offset,
            self.panel.row_offset,
        )?;

        Ok(MirrorConfig {
            geometry: self.geometry(),
            mode: self.update_mode()?,
            thresholds: Thresholds {
                change_percent: self.update.change_threshold.clamp(0.0, 100.0),
                min_update_region: self.update.min_update_region,
            },
            interlace,
            pace: Duration::from_millis(self.timing.pace_ms),
            report_fps: self.timing.show_fps,
            fps_report_every: self.timing.fps_report_frames.max(1),
            fps_min_window: Duration::from_millis(self.timing.fps_min_window_ms),
            clear_on_start: self.panel.clear_on_start,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
