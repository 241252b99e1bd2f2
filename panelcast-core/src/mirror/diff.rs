//! Pixel-level change detection between consecutive frames.
//!
//! Compares every pixel of the new frame against the retained previous
//! frame, then decides how much of the panel has to be rewritten:
//!
//! 1. More than `change_percent` of the screen differs → [`UpdateDecision::Full`].
//! 2. Nothing differs → [`UpdateDecision::NoOp`].
//! 3. Enough pixels differ inside a box wider and taller than 2 pixels →
//!    [`UpdateDecision::Partial`] with the bounding box.
//! 4. Any other non-zero change → `Full`.
//!
//! Rule 4 sends a whole frame for a one-pixel change. That is the
//! established behaviour of the mirror and is kept as-is.

use crate::error::PanelError;
use crate::mirror::interlace::Interlace;
use crate::mirror::types::{BoundingRect, Frame, UpdateDecision, UpdateMask};

// ── Thresholds ───────────────────────────────────────────────────

/// Tuning knobs for the update decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Percentage of changed pixels above which a full update is sent.
    pub change_percent: f64,
    /// A partial update needs strictly more changed pixels than this.
    pub min_update_region: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            change_percent: 5.0,
            min_update_region: 10,
        }
    }
}

// ── FrameDelta ───────────────────────────────────────────────────

/// Result of one diff pass.
#[derive(Debug, Clone)]
pub struct FrameDelta {
    pub decision: UpdateDecision,
    pub mask: UpdateMask,
    /// Pixels that differ anywhere in the frame.
    pub changed_pixels: usize,
    /// `changed_pixels * 100 / (W*H)`.
    pub changed_percent: f64,
}

// ── FrameDiff ────────────────────────────────────────────────────

/// Stateless diff engine. The previous frame is owned by
/// [`FrameCache`](crate::mirror::cache::FrameCache) and passed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDiff {
    thresholds: Thresholds,
    skip_rows: Option<Interlace>,
}

impl FrameDiff {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            skip_rows: None,
        }
    }

    /// Ignore rows blanked by `interlace` when building the bounding box.
    pub fn with_interlace(mut self, interlace: Option<Interlace>) -> Self {
        self.skip_rows = interlace;
        self
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Compare `current` against `previous`. Neither buffer is modified.
    pub fn compute(&self, current: &Frame, previous: &Frame) -> Result<FrameDelta, PanelError> {
        let geometry = current.geometry();
        if previous.geometry() != geometry {
            return Err(PanelError::GeometryMismatch {
                expected: geometry.pixel_count(),
                actual: previous.pixels().len(),
            });
        }

        let total = geometry.pixel_count();
        let mut bits = Vec::new();
        bits.try_reserve_exact(total)
            .map_err(|_| PanelError::Allocation { bytes: total })?;

        let mut changed_pixels = 0usize;
        bits.extend(
            current
                .pixels()
                .iter()
                .zip(previous.pixels())
                .map(|(cur, prev)| {
                    let differs = cur != prev;
                    changed_pixels += differs as usize;
                    differs
                }),
        );
        let mask = UpdateMask::new(geometry, bits);

        let changed_percent = if total == 0 {
            0.0
        } else {
            changed_pixels as f64 * 100.0 / total as f64
        };

        let decision = if changed_percent > self.thresholds.change_percent {
            UpdateDecision::Full
        } else {
            self.decide_region(&mask)
        };

        Ok(FrameDelta {
            decision,
            mask,
            changed_pixels,
            changed_percent,
        })
    }

    // ── Internal ─────────────────────────────────────────────────

    fn decide_region(&self, mask: &UpdateMask) -> UpdateDecision {
        let mut bounds: Option<BoundingRect> = None;
        let mut counted = 0usize;

        for y in 0..mask.geometry().height {
            if self.skip_rows.is_some_and(|il| il.blanks_row(y)) {
                continue;
            }
            let Some(row) = mask.row(y) else { break };
            for (x, _) in row.iter().enumerate().filter(|&(_, &set)| set) {
                let x = x as u32;
                counted += 1;
                match bounds.as_mut() {
                    Some(rect) => rect.include(x, y),
                    None => bounds = Some(BoundingRect::point(x, y)),
                }
            }
        }

        match bounds {
            None => UpdateDecision::NoOp,
            Some(rect) if counted > self.thresholds.min_update_region && rect.spans_more_than(2) => {
                UpdateDecision::Partial(rect)
            }
            Some(_) => UpdateDecision::Full,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::types::Geometry;

    const PANEL: Geometry = Geometry::new(320, 170);

    fn engine() -> FrameDiff {
        FrameDiff::new(Thresholds {
            change_percent: 5.0,
            min_update_region: 10,
        })
    }

    fn blank() -> Frame {
        Frame::zeroed(PANEL).unwrap()
    }

    #[test]
    fn identical_frames_are_noop() {
        let frame = Frame::filled(PANEL, 0x1234).unwrap();
        let delta = engine().compute(&frame, &frame.clone()).unwrap();
        assert_eq!(delta.decision, UpdateDecision::NoOp);
        assert_eq!(delta.changed_pixels, 0);
        assert_eq!(delta.mask.count(), 0);
    }

    #[test]
    fn many_changes_force_full() {
        let previous = blank();
        let mut current = blank();
        for px in current.pixels_mut().iter_mut().take(3000) {
            *px = 0xFFFF;
        }
        let delta = engine().compute(&current, &previous).unwrap();
        assert_eq!(delta.changed_pixels, 3000);
        assert!((delta.changed_percent - 5.514).abs() < 0.01);
        assert_eq!(delta.decision, UpdateDecision::Full);
    }

    #[test]
    fn clustered_change_is_partial_with_exact_box() {
        let previous = blank();
        let mut current = blank();
        // Both diagonals of the 10x10 block at (100, 50): 20 distinct pixels.
        for i in 0..10 {
            current.set(100 + i, 50 + i, 0xF800).unwrap();
            current.set(109 - i, 50 + i, 0xF800).unwrap();
        }
        let delta = engine().compute(&current, &previous).unwrap();
        assert_eq!(delta.changed_pixels, 20);
        assert!(delta.changed_percent < 0.04);
        assert_eq!(
            delta.decision,
            UpdateDecision::Partial(BoundingRect::new(100, 50, 109, 59))
        );
    }

    #[test]
    fn single_pixel_falls_back_to_full() {
        let previous = blank();
        let mut current = blank();
        current.set(10, 10, 1).unwrap();
        let delta = engine().compute(&current, &previous).unwrap();
        assert_eq!(delta.changed_pixels, 1);
        assert_eq!(delta.decision, UpdateDecision::Full);
    }

    #[test]
    fn thin_change_falls_back_to_full() {
        let previous = blank();
        let mut current = blank();
        // 3 columns wide: extent 2, not more than 2.
        for y in 0..30 {
            for x in 40..43 {
                current.set(x, y, 0x07E0).unwrap();
            }
        }
        let delta = engine().compute(&current, &previous).unwrap();
        assert_eq!(delta.changed_pixels, 90);
        assert_eq!(delta.decision, UpdateDecision::Full);
    }

    #[test]
    fn mask_marks_exactly_the_changed_pixels() {
        let previous = blank();
        let mut current = blank();
        current.set(3, 4, 9).unwrap();
        current.set(300, 160, 9).unwrap();
        let delta = engine().compute(&current, &previous).unwrap();
        assert!(delta.mask.is_set(3, 4));
        assert!(delta.mask.is_set(300, 160));
        assert!(!delta.mask.is_set(4, 4));
        assert_eq!(delta.mask.count(), 2);
    }

    #[test]
    fn blanked_rows_are_left_out_of_the_box() {
        let il = Interlace::new(2).unwrap();
        let diff = engine().with_interlace(Some(il));
        let previous = blank();
        let mut current = blank();
        // Block on even rows 20..=28 plus noise on odd row 41.
        for y in (20..=28).step_by(2) {
            for x in 10..20 {
                current.set(x, y, 0xFFFF).unwrap();
            }
        }
        current.set(200, 41, 0xFFFF).unwrap();

        let delta = diff.compute(&current, &previous).unwrap();
        assert_eq!(
            delta.decision,
            UpdateDecision::Partial(BoundingRect::new(10, 20, 19, 28))
        );
    }

    #[test]
    fn changes_only_on_blanked_rows_are_noop() {
        let diff = engine().with_interlace(Some(Interlace::new(2).unwrap()));
        let previous = blank();
        let mut current = blank();
        current.set(5, 1, 1).unwrap();
        let delta = diff.compute(&current, &previous).unwrap();
        assert_eq!(delta.changed_pixels, 1);
        assert_eq!(delta.decision, UpdateDecision::NoOp);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let previous = blank();
        let current = Frame::filled(PANEL, 0xAAAA).unwrap();
        let (p, c) = (previous.clone(), current.clone());
        let _ = engine().compute(&current, &previous).unwrap();
        assert_eq!(previous, p);
        assert_eq!(current, c);
    }

    #[test]
    fn geometry_mismatch_is_error() {
        let a = Frame::zeroed(Geometry::new(4, 4)).unwrap();
        let b = Frame::zeroed(Geometry::new(8, 2)).unwrap();
        assert!(matches!(
            engine().compute(&a, &b),
            Err(PanelError::GeometryMismatch { .. })
        ));
    }
}
