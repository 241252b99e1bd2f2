//! # panelcast-core
//!
//! Core library for mirroring a host screen onto a small serial-attached
//! RGB565 panel.
//!
//! This crate contains:
//! - **Frame model**: `Geometry`, `Frame`, `BoundingRect`, `UpdateDecision`
//! - **Diff engine**: `FrameDiff` picks a no-op, full or partial update
//! - **Region extractor**: packs a changed rectangle into a contiguous buffer
//! - **Interlace filter**: optional periodic row blanking
//! - **Frame cache**: the retained copy of what the panel currently shows
//! - **Transport**: `PanelSink` / `PanelBus` traits, `WindowedPanel`, `MemoryPanel`
//! - **Service**: `MirrorService`, the capture → diff → transmit → commit loop
//! - **Error**: `PanelError`, a typed, `thiserror`-based error hierarchy

pub mod error;
pub mod mirror;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::PanelError;
pub use mirror::{
    BoundingRect, CycleReport, FpsMeter, Frame, FrameCache, FrameDelta, FrameDiff, FrameSource,
    Geometry, Interlace, MemoryPanel, MirrorConfig, MirrorService, MirrorStats, PanelBus,
    PanelSink, RegionBuffer, StopHandle, Thresholds, UpdateDecision, UpdateMask, UpdateMode,
    WindowedPanel, check_window,
};
