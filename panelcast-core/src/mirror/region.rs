//! Packing of rectangular sub-blocks.
//!
//! A partial panel update streams one address window's worth of pixels,
//! so the changed rectangle has to be copied out of the row-major frame
//! into a contiguous buffer first.

use crate::error::PanelError;
use crate::mirror::types::{BoundingRect, Frame};

/// Contiguous row-major copy of `rect`; row 0 is `rect.min_y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionBuffer {
    rect: BoundingRect,
    pixels: Vec<u16>,
}

impl RegionBuffer {
    pub fn rect(&self) -> BoundingRect {
        self.rect
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// Row `dy` of the region (relative to `rect.min_y`).
    pub fn row(&self, dy: u32) -> Option<&[u16]> {
        if dy >= self.rect.height() {
            return None;
        }
        let w = self.rect.width() as usize;
        let start = dy as usize * w;
        Some(&self.pixels[start..start + w])
    }
}

/// Copy `rect` out of `frame`.
///
/// Fails with [`PanelError::OutOfBounds`] for a rectangle outside the
/// frame and [`PanelError::Allocation`] if the buffer cannot be reserved.
pub fn extract(frame: &Frame, rect: BoundingRect) -> Result<RegionBuffer, PanelError> {
    let geometry = frame.geometry();
    geometry.check_rect(&rect)?;

    let len = rect.pixel_count();
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(len)
        .map_err(|_| PanelError::alloc_pixels(len))?;

    for y in rect.min_y..=rect.max_y {
        let span = geometry
            .span(y, rect.min_x, rect.max_x)
            .ok_or_else(|| PanelError::Other(format!("row {y} outside frame")))?;
        pixels.extend_from_slice(&frame.pixels()[span]);
    }

    Ok(RegionBuffer { rect, pixels })
}

/// Write `region` back into `frame` at its rectangle.
pub fn insert(frame: &mut Frame, region: &RegionBuffer) -> Result<(), PanelError> {
    let geometry = frame.geometry();
    let rect = region.rect;
    geometry.check_rect(&rect)?;

    let w = rect.width() as usize;
    for (src, y) in region.pixels.chunks_exact(w).zip(rect.min_y..=rect.max_y) {
        let span = geometry
            .span(y, rect.min_x, rect.max_x)
            .ok_or_else(|| PanelError::Other(format!("row {y} outside frame")))?;
        frame.pixels_mut()[span].copy_from_slice(src);
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────
