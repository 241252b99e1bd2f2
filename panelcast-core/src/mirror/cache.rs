//! The retained previous frame.

use crate::error::PanelError;
use crate::mirror::types::{Frame, Geometry};

/// Holds the last frame that was completely reflected on the panel.
///
/// Starts all-black and is overwritten wholesale by [`commit`](Self::commit)
/// after each successful transmit, whatever kind of update was sent.
#[derive(Debug, Clone)]
pub struct FrameCache {
    previous: Frame,
}

impl FrameCache {
    pub fn new(geometry: Geometry) -> Result<Self, PanelError> {
        Ok(Self {
            previous: Frame::zeroed(geometry)?,
        })
    }

    pub fn previous(&self) -> &Frame {
        &self.previous
    }

    pub fn geometry(&self) -> Geometry {
        self.previous.geometry()
    }

    /// Replace the cached frame with `current`.
    pub fn commit(&mut self, current: &Frame) -> Result<(), PanelError> {
        self.previous.copy_from(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_black() {
        let cache = FrameCache::new(Geometry::new(6, 4)).unwrap();
        assert!(cache.previous().pixels().iter().all(|&p| p == 0));
        assert_eq!(cache.previous().pixels().len(), 24);
    }

    #[test]
    fn commit_copies_whole_frame() {
        let g = Geometry::new(6, 4);
        let mut cache = FrameCache::new(g).unwrap();
        let mut frame = Frame::filled(g, 0x001F).unwrap();
        frame.set(5, 3, 0xF800).unwrap();

        cache.commit(&frame).unwrap();
        assert_eq!(cache.previous(), &frame);

        // Same data again is harmless.
        cache.commit(&frame).unwrap();
        assert_eq!(cache.previous(), &frame);
    }

    #[test]
    fn commit_rejects_other_shapes() {
        let mut cache = FrameCache::new(Geometry::new(6, 4)).unwrap();
        let other = Frame::zeroed(Geometry::new(4, 6)).unwrap();
        assert!(cache.commit(&other).is_err());
        assert_eq!(cache.geometry(), Geometry::new(6, 4));
    }
}
