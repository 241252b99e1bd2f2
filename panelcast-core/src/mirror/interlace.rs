//! Periodic row blanking.
//!
//! Every row `y` with `y % period == 1` is forced to black. With the
//! default period of 2 that is every odd row, halving the lit area.
//! The diff engine uses [`Interlace::blanks_row`] to keep blanked rows
//! out of the bounding box.

use crate::error::PanelError;
use crate::mirror::types::Frame;

/// Interlace filter. Disabled interlacing is `Option::<Interlace>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interlace {
    period: u32,
}

impl Interlace {
    /// Period used when the configuration does not give one.
    pub const DEFAULT_PERIOD: u32 = 2;

    /// Create a filter blanking one row out of every `period`.
    ///
    /// A period of 1 is accepted and blanks nothing.
    pub fn new(period: u32) -> Result<Self, PanelError> {
        if period == 0 {
            return Err(PanelError::InvalidConfig(
                "interlace period must be at least 1".into(),
            ));
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Whether row `y` is forced black.
    pub fn blanks_row(&self, y: u32) -> bool {
        y % self.period == 1
    }

    /// Zero every blanked row of `frame` and hand it back.
    pub fn apply(&self, mut frame: Frame) -> Frame {
        let height = frame.geometry().height;
        for y in (0..height).filter(|&y| self.blanks_row(y)) {
            if let Some(row) = frame.row_mut(y) {
                row.fill(0);
            }
        }
        frame
    }
}

impl Default for Interlace {
    fn default() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
        }
    }
}
