//! Capture and panel collaborators.
//!
//! The service talks to the outside world through two traits:
//! [`FrameSource`] yields byte-order-corrected RGB565 frames and
//! [`PanelSink`] puts pixels on the panel. Rectangles handed to a sink are
//! frame-local; any device offset is the sink's business.
//!
//! [`WindowedPanel`] is the sink for MIPI-DCS style controllers
//! (ST7789 and friends): every transmit is "set address window, then
//! stream pixels" over a [`PanelBus`].
//!
//! ## Command sequence per transmit
//!
//! ```text
//! 0x2A  CASET  x0_hi x0_lo x1_hi x1_lo   (column window, offset applied)
//! 0x2B  RASET  y0_hi y0_lo y1_hi y1_lo   (row window, offset applied)
//! 0x2C  RAMWR
//! data         RGB565 pixels, big-endian, row-major
//! ```

use bytes::BufMut;

use crate::error::PanelError;
use crate::mirror::region::{self, RegionBuffer};
use crate::mirror::types::{BoundingRect, Frame, Geometry};

// ── Traits ───────────────────────────────────────────────────────

/// Produces one captured frame per call.
pub trait FrameSource {
    /// Grab the current screen. Errors are fatal for the run.
    fn capture(&mut self) -> Result<Frame, PanelError>;
}

/// Puts pixels on the panel.
pub trait PanelSink {
    /// Rewrite the whole panel with `frame`.
    fn transmit_full(&mut self, frame: &Frame) -> Result<(), PanelError>;

    /// Rewrite only `region.rect()` with the packed pixels.
    fn transmit_region(&mut self, region: &RegionBuffer) -> Result<(), PanelError>;
}

/// Low-level link to a panel controller: command bytes on one side of the
/// D/C line, pixel data on the other.
pub trait PanelBus {
    /// Send opcode `cmd` followed by its parameter bytes.
    fn command(&mut self, cmd: u8, params: &[u8]) -> Result<(), PanelError>;

    /// Stream raw pixel bytes after a memory-write command.
    fn write_pixels(&mut self, data: &[u8]) -> Result<(), PanelError>;
}

// ── WindowedPanel ────────────────────────────────────────────────

/// Column address set.
pub const CMD_CASET: u8 = 0x2A;
/// Row address set.
pub const CMD_RASET: u8 = 0x2B;
/// Memory write.
pub const CMD_RAMWR: u8 = 0x2C;

/// [`PanelSink`] that addresses a window on the controller and streams
/// big-endian RGB565 into it.
pub struct WindowedPanel<B> {
    bus: B,
    geometry: Geometry,
    col_offset: u16,
    row_offset: u16,
    /// Reused per transmit; sized for a full frame up front.
    scratch: Vec<u8>,
}

impl<B: PanelBus> WindowedPanel<B> {
    /// Fails if the offset window does not fit the controller's address
    /// registers or the full-frame scratch buffer cannot be reserved.
    pub fn new(
        bus: B,
        geometry: Geometry,
        col_offset: u16,
        row_offset: u16,
    ) -> Result<Self, PanelError> {
        check_window(geometry, col_offset, row_offset)?;

        let bytes = geometry
            .pixel_count()
            .checked_mul(2)
            .ok_or(PanelError::Allocation { bytes: usize::MAX })?;
        let mut scratch = Vec::new();
        scratch
            .try_reserve_exact(bytes)
            .map_err(|_| PanelError::Allocation { bytes })?;

        Ok(Self {
            bus,
            geometry,
            col_offset,
            row_offset,
            scratch,
        })
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    // ── Internal ─────────────────────────────────────────────────

    fn set_window(&mut self, rect: &BoundingRect) -> Result<(), PanelError> {
        let x0 = offset_coord(rect.min_x, self.col_offset)?;
        let x1 = offset_coord(rect.max_x, self.col_offset)?;
        let y0 = offset_coord(rect.min_y, self.row_offset)?;
        let y1 = offset_coord(rect.max_y, self.row_offset)?;

        self.bus.command(CMD_CASET, &window_params(x0, x1))?;
        self.bus.command(CMD_RASET, &window_params(y0, y1))?;
        self.bus.command(CMD_RAMWR, &[])
    }

    fn stream(&mut self, pixels: &[u16]) -> Result<(), PanelError> {
        self.scratch.clear();
        for &px in pixels {
            self.scratch.put_u16(px);
        }
        self.bus.write_pixels(&self.scratch)
    }
}

impl<B: PanelBus> PanelSink for WindowedPanel<B> {
    fn transmit_full(&mut self, frame: &Frame) -> Result<(), PanelError> {
        if frame.geometry() != self.geometry {
            return Err(PanelError::GeometryMismatch {
                expected: self.geometry.pixel_count(),
                actual: frame.pixels().len(),
            });
        }
        let full = self.geometry.full_rect();
        self.set_window(&full)?;
        self.stream(frame.pixels())
    }

    fn transmit_region(&mut self, region: &RegionBuffer) -> Result<(), PanelError> {
        let rect = region.rect();
        self.geometry.check_rect(&rect)?;
        self.set_window(&rect)?;
        self.stream(region.pixels())
    }
}

/// Check that every pixel of `geometry`, shifted by the offsets, is
/// addressable through the 16-bit CASET/RASET registers.
pub fn check_window(geometry: Geometry, col_offset: u16, row_offset: u16) -> Result<(), PanelError> {
    if geometry.is_empty() {
        return Err(PanelError::InvalidConfig(format!(
            "panel size {}x{} has no pixels",
            geometry.width, geometry.height
        )));
    }
    let fits = |extent: u32, offset: u16| {
        u64::from(extent) - 1 + u64::from(offset) <= u64::from(u16::MAX)
    };
    if !fits(geometry.width, col_offset) || !fits(geometry.height, row_offset) {
        return Err(PanelError::InvalidConfig(format!(
            "{}x{} panel at offset ({col_offset}, {row_offset}) exceeds the 16-bit window registers",
            geometry.width, geometry.height
        )));
    }
    Ok(())
}

fn offset_coord(value: u32, offset: u16) -> Result<u16, PanelError> {
    value
        .checked_add(u32::from(offset))
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(|| {
            PanelError::Transport(format!(
                "address {value}+{offset} does not fit the 16-bit window registers"
            ))
        })
}

fn window_params(start: u16, end: u16) -> [u8; 4] {
    let [s_hi, s_lo] = start.to_be_bytes();
    let [e_hi, e_lo] = end.to_be_bytes();
    [s_hi, s_lo, e_hi, e_lo]
}

// ── MemoryPanel ──────────────────────────────────────────────────

/// [`PanelSink`] backed by an in-memory framebuffer.
///
/// Useful for dry runs: it applies every update exactly as a real panel
/// would, so its contents can be compared with what was captured.
#[derive(Debug, Clone)]
pub struct MemoryPanel {
    screen: Frame,
    full_updates: u64,
    region_updates: u64,
    pixels_written: u64,
}

impl MemoryPanel {
    pub fn new(geometry: Geometry) -> Result<Self, PanelError> {
        Ok(Self {
            screen: Frame::zeroed(geometry)?,
            full_updates: 0,
            region_updates: 0,
            pixels_written: 0,
        })
    }

    /// What the panel is currently showing.
    pub fn screen(&self) -> &Frame {
        &self.screen
    }

    pub fn full_updates(&self) -> u64 {
        self.full_updates
    }

    pub fn region_updates(&self) -> u64 {
        self.region_updates
    }

    pub fn pixels_written(&self) -> u64 {
        self.pixels_written
    }
}

impl PanelSink for MemoryPanel {
    fn transmit_full(&mut self, frame: &Frame) -> Result<(), PanelError> {
        self.screen.copy_from(frame)?;
        self.full_updates += 1;
        self.pixels_written += frame.pixels().len() as u64;
        Ok(())
    }

    fn transmit_region(&mut self, region: &RegionBuffer) -> Result<(), PanelError> {
        region::insert(&mut self.screen, region)?;
        self.region_updates += 1;
        self.pixels_written += region.pixels().len() as u64;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
