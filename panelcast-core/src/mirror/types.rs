//! Shared types for the mirroring pipeline.
//!
//! Every buffer in the pipeline is a row-major run of RGB565 pixels whose
//! shape is described by a [`Geometry`]. All 2D indexing goes through
//! `Geometry` so no stage does its own `y * width + x` arithmetic.

use std::ops::Range;

use crate::error::PanelError;

// ── Geometry ─────────────────────────────────────────────────────

/// Frame dimensions in pixels, fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Geometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels in a frame of this shape.
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// `true` when either dimension is zero.
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Linear index of `(x, y)`, or `None` if it lies outside the frame.
    pub fn index(self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// Linear index range covering row `y`.
    pub fn row_span(self, y: u32) -> Option<Range<usize>> {
        let start = self.index(0, y)?;
        Some(start..start + self.width as usize)
    }

    /// Linear index range covering columns `min_x..=max_x` of row `y`.
    pub fn span(self, y: u32, min_x: u32, max_x: u32) -> Option<Range<usize>> {
        if min_x > max_x {
            return None;
        }
        let start = self.index(min_x, y)?;
        let end = self.index(max_x, y)? + 1;
        Some(start..end)
    }

    /// Rectangle covering the whole frame.
    pub const fn full_rect(self) -> BoundingRect {
        BoundingRect {
            min_x: 0,
            max_x: self.width.saturating_sub(1),
            min_y: 0,
            max_y: self.height.saturating_sub(1),
        }
    }

    /// Whether `rect` is well-ordered and lies entirely inside the frame.
    pub fn contains(self, rect: &BoundingRect) -> bool {
        rect.min_x <= rect.max_x
            && rect.min_y <= rect.max_y
            && rect.max_x < self.width
            && rect.max_y < self.height
    }

    /// Like [`contains`](Self::contains) but as a typed error.
    pub fn check_rect(self, rect: &BoundingRect) -> Result<(), PanelError> {
        if self.contains(rect) {
            Ok(())
        } else {
            Err(PanelError::OutOfBounds {
                x0: rect.min_x,
                y0: rect.min_y,
                x1: rect.max_x,
                y1: rect.max_y,
                width: self.width,
                height: self.height,
            })
        }
    }
}

// ── BoundingRect ─────────────────────────────────────────────────

/// Axis-aligned rectangle with **inclusive** bounds on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingRect {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl BoundingRect {
    /// Rectangle from corner coordinates `(x0, y0)` to `(x1, y1)` inclusive.
    pub const fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self {
            min_x: x0,
            max_x: x1,
            min_y: y0,
            max_y: y1,
        }
    }

    /// A 1×1 rectangle.
    pub const fn point(x: u32, y: u32) -> Self {
        Self::new(x, y, x, y)
    }

    /// Grow the rectangle so it also encloses `(x, y)`.
    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub const fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub const fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Number of pixels enclosed.
    pub const fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// `true` when the extent (`max - min`) exceeds `n` on both axes.
    pub const fn spans_more_than(&self, n: u32) -> bool {
        self.max_x - self.min_x > n && self.max_y - self.min_y > n
    }
}

// ── Frame ────────────────────────────────────────────────────────

/// One RGB565 image in row-major order, byte order already corrected.
///
/// The pixel vector always holds exactly `geometry.pixel_count()` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    geometry: Geometry,
    pixels: Vec<u16>,
}

impl Frame {
    /// All-black frame. Reservation is fallible so an oversized geometry
    /// surfaces as [`PanelError::Allocation`] instead of aborting.
    pub fn zeroed(geometry: Geometry) -> Result<Self, PanelError> {
        Self::filled(geometry, 0)
    }

    /// Frame with every pixel set to `value`.
    pub fn filled(geometry: Geometry, value: u16) -> Result<Self, PanelError> {
        let len = geometry.pixel_count();
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| PanelError::alloc_pixels(len))?;
        pixels.resize(len, value);
        Ok(Self { geometry, pixels })
    }

    /// Wrap an existing pixel vector, checking its length.
    pub fn from_pixels(geometry: Geometry, pixels: Vec<u16>) -> Result<Self, PanelError> {
        if pixels.len() != geometry.pixel_count() {
            return Err(PanelError::GeometryMismatch {
                expected: geometry.pixel_count(),
                actual: pixels.len(),
            });
        }
        Ok(Self { geometry, pixels })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u16] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u16> {
        self.pixels
    }

    /// Row `y`, or `None` past the bottom edge.
    pub fn row(&self, y: u32) -> Option<&[u16]> {
        let span = self.geometry.row_span(y)?;
        Some(&self.pixels[span])
    }

    pub fn row_mut(&mut self, y: u32) -> Option<&mut [u16]> {
        let span = self.geometry.row_span(y)?;
        Some(&mut self.pixels[span])
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        self.geometry.index(x, y).map(|i| self.pixels[i])
    }

    /// Set a single pixel.
    pub fn set(&mut self, x: u32, y: u32, value: u16) -> Result<(), PanelError> {
        let i = self.geometry.index(x, y).ok_or(PanelError::OutOfBounds {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
            width: self.geometry.width,
            height: self.geometry.height,
        })?;
        self.pixels[i] = value;
        Ok(())
    }

    /// Overwrite every pixel with the contents of `other`.
    pub fn copy_from(&mut self, other: &Frame) -> Result<(), PanelError> {
        if other.geometry != self.geometry {
            return Err(PanelError::GeometryMismatch {
                expected: self.pixels.len(),
                actual: other.pixels.len(),
            });
        }
        self.pixels.copy_from_slice(&other.pixels);
        Ok(())
    }
}

// ── UpdateMask ───────────────────────────────────────────────────

/// Per-pixel "changed since the previous frame" flags for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateMask {
    geometry: Geometry,
    bits: Vec<bool>,
}

impl UpdateMask {
    pub(crate) fn new(geometry: Geometry, bits: Vec<bool>) -> Self {
        debug_assert_eq!(bits.len(), geometry.pixel_count());
        Self { geometry, bits }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Whether `(x, y)` changed. Out-of-range coordinates read as unchanged.
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.geometry.index(x, y).is_some_and(|i| self.bits[i])
    }

    pub fn row(&self, y: u32) -> Option<&[bool]> {
        let span = self.geometry.row_span(y)?;
        Some(&self.bits[span])
    }

    /// Number of changed pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }
}

// ── UpdateDecision ───────────────────────────────────────────────

/// What the panel needs this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    /// No pixel differs; nothing goes over the wire.
    NoOp,
    /// Retransmit the entire frame.
    Full,
    /// Retransmit only the enclosed rectangle.
    Partial(BoundingRect),
}

impl UpdateDecision {
    /// Short name for log lines.
    pub const fn label(&self) -> &'static str {
        match self {
            UpdateDecision::NoOp => "noop",
            UpdateDecision::Full => "full",
            UpdateDecision::Partial(_) => "partial",
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_bounds_checked() {
        let g = Geometry::new(4, 3);
        assert_eq!(g.index(0, 0), Some(0));
        assert_eq!(g.index(3, 2), Some(11));
        assert_eq!(g.index(4, 0), None);
        assert_eq!(g.index(0, 3), None);
    }

    #[test]
    fn spans_cover_expected_ranges() {
        let g = Geometry::new(10, 5);
        assert_eq!(g.row_span(2), Some(20..30));
        assert_eq!(g.span(1, 3, 5), Some(13..16));
        assert_eq!(g.span(1, 5, 3), None);
        assert_eq!(g.span(1, 3, 10), None);
        assert_eq!(g.row_span(5), None);
    }

    #[test]
    fn contains_rejects_inverted_and_overflowing_rects() {
        let g = Geometry::new(320, 170);
        assert!(g.contains(&g.full_rect()));
        assert!(!g.contains(&BoundingRect::new(5, 0, 4, 0)));
        assert!(!g.contains(&BoundingRect::new(0, 0, 320, 10)));
        assert!(matches!(
            g.check_rect(&BoundingRect::new(0, 0, 0, 170)),
            Err(PanelError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn rect_include_grows_box() {
        let mut r = BoundingRect::point(5, 5);
        r.include(2, 9);
        r.include(7, 3);
        assert_eq!(r, BoundingRect::new(2, 3, 7, 9));
        assert_eq!(r.width(), 6);
        assert_eq!(r.height(), 7);
        assert_eq!(r.pixel_count(), 42);
        assert!(r.spans_more_than(2));
        assert!(!BoundingRect::new(0, 0, 2, 10).spans_more_than(2));
    }

    #[test]
    fn frame_from_pixels_checks_length() {
        let g = Geometry::new(2, 2);
        assert!(Frame::from_pixels(g, vec![0; 4]).is_ok());
        assert!(matches!(
            Frame::from_pixels(g, vec![0; 3]),
            Err(PanelError::GeometryMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn frame_rows_and_pixels() {
        let g = Geometry::new(3, 2);
        let mut f = Frame::zeroed(g).unwrap();
        f.set(1, 1, 0xF800).unwrap();
        assert_eq!(f.row(1).unwrap(), &[0, 0xF800, 0]);
        assert_eq!(f.get(1, 1), Some(0xF800));
        assert_eq!(f.get(3, 0), None);
        assert!(f.set(0, 2, 1).is_err());
    }

    #[test]
    fn copy_from_requires_same_geometry() {
        let mut a = Frame::zeroed(Geometry::new(2, 2)).unwrap();
        let b = Frame::filled(Geometry::new(2, 2), 7).unwrap();
        a.copy_from(&b).unwrap();
        assert_eq!(a, b);

        let c = Frame::zeroed(Geometry::new(4, 1)).unwrap();
        assert!(a.copy_from(&c).is_err());
    }
}
