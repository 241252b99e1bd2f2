//! Domain-specific error types for the mirroring pipeline.
//!
//! All fallible operations return `Result<T, PanelError>`.
//! Capture and transport failures are fatal for a run; an allocation
//! failure while packing a partial region is the only recoverable kind.

use thiserror::Error;

/// The canonical error type for panelcast.
#[derive(Debug, Error)]
pub enum PanelError {
    // ── Collaborator Errors ──────────────────────────────────────
    /// The capture backend is unavailable or returned malformed data.
    #[error("capture failed: {0}")]
    Capture(String),

    /// Writing to the panel failed. A half-written frame cannot be
    /// resumed, so this always ends the run.
    #[error("transport failed: {0}")]
    Transport(String),

    // ── Buffer Errors ────────────────────────────────────────────
    /// A pixel buffer could not be reserved.
    #[error("allocation of {bytes} bytes failed")]
    Allocation { bytes: usize },

    /// A rectangle or coordinate falls outside the frame.
    #[error("rectangle {x0},{y0}..{x1},{y1} outside {width}x{height} frame")]
    OutOfBounds {
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
        width: u32,
        height: u32,
    },

    /// Two buffers that must share a shape do not.
    #[error("geometry mismatch: expected {expected} pixels, got {actual}")]
    GeometryMismatch { expected: usize, actual: usize },

    // ── Setup Errors ─────────────────────────────────────────────
    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading a file outside the capture/transport paths failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl PanelError {
    /// Allocation failure for a buffer of `pixels` RGB565 values.
    pub(crate) fn alloc_pixels(pixels: usize) -> Self {
        PanelError::Allocation {
            bytes: pixels.saturating_mul(2),
        }
    }
}
