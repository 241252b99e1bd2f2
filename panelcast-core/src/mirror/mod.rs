//! # Screen-to-panel mirroring pipeline
//!
//! Keeps a small SPI/serial panel in sync with a captured screen while
//! sending as few pixels as possible over the slow bus.
//!
//! ## Architecture
//!
//! ```text
//! FrameSource::capture
//!   ↓
//! Interlace::apply          (optional row blanking)
//!   ↓
//! FrameDiff::compute  ◄──── FrameCache::previous
//!   ↓
//! NoOp │ Full │ Partial(rect) ──► region::extract
//!   ↓
//! PanelSink::transmit_full / transmit_region
//!   ↓
//! FrameCache::commit ──► pace ──► next cycle
//! ```
//!
//! ## Sub-modules
//!
//! | Module       | Purpose                                             |
//! |------------- |-----------------------------------------------------|
//! | `types`      | Geometry, frames, masks, rectangles, decisions      |
//! | `interlace`  | Periodic row blanking filter                        |
//! | `diff`       | Change detection and update decision                |
//! | `region`     | Packing / unpacking of rectangular sub-blocks       |
//! | `cache`      | The retained previous frame                         |
//! | `transport`  | Capture / panel traits, windowed and in-memory sinks |
//! | `fps`        | Frame-rate meter for periodic reporting             |
//! | `service`    | Per-cycle orchestrator and cancellation             |

pub mod cache;
pub mod diff;
pub mod fps;
pub mod interlace;
pub mod region;
pub mod service;
pub mod transport;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────

pub use cache::FrameCache;
pub use diff::{FrameDelta, FrameDiff, Thresholds};
pub use fps::FpsMeter;
pub use interlace::Interlace;
pub use region::RegionBuffer;
pub use service::{CycleReport, MirrorConfig, MirrorService, MirrorStats, StopHandle, UpdateMode};
pub use transport::{FrameSource, MemoryPanel, PanelBus, PanelSink, WindowedPanel, check_window};
pub use types::{BoundingRect, Frame, Geometry, UpdateDecision, UpdateMask};
