//! Raw framebuffer capture.
//!
//! Reads a 16-bit RGB565 image from the start of a seekable byte source
//! (typically `/dev/fb0`, or a file that a compositor keeps rewriting)
//! once per cycle. The source may pad rows, so rows are read `stride`
//! bytes apart and only the first `width * 2` bytes of each are used.
//!
//! Pixels are decoded little-endian, the native layout of Linux 16 bpp
//! framebuffers; `swap_bytes` flips them for sources that store the
//! high byte first.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use panelcast_core::{Frame, FrameSource, Geometry, PanelError};

/// [`FrameSource`] over any `Read + Seek` holding raw RGB565 rows.
pub struct RawFramebufferSource<R> {
    reader: R,
    geometry: Geometry,
    /// Row pitch in **bytes** (may exceed `width * 2`).
    stride: usize,
    swap_bytes: bool,
    row_buf: Vec<u8>,
}

impl RawFramebufferSource<File> {
    /// Open `path` for reading.
    pub fn open(
        path: &Path,
        geometry: Geometry,
        stride: usize,
        swap_bytes: bool,
    ) -> Result<Self, PanelError> {
        let file = File::open(path)
            .map_err(|e| PanelError::Capture(format!("open {}: {e}", path.display())))?;
        Self::new(file, geometry, stride, swap_bytes)
    }
}

impl<R: Read + Seek> RawFramebufferSource<R> {
    /// Wrap `reader`. A `stride` of 0 means tightly packed rows.
    pub fn new(
        reader: R,
        geometry: Geometry,
        stride: usize,
        swap_bytes: bool,
    ) -> Result<Self, PanelError> {
        let row_bytes = geometry.width as usize * 2;
        let stride = if stride == 0 { row_bytes } else { stride };
        if stride < row_bytes {
            return Err(PanelError::InvalidConfig(format!(
                "capture stride {stride} is shorter than a {row_bytes}-byte row"
            )));
        }
        let mut row_buf = try_buffer::<u8>(stride, stride)?;
        row_buf.resize(stride, 0);
        Ok(Self {
            reader,
            geometry,
            stride,
            swap_bytes,
            row_buf,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    fn read_frame(&mut self, pixels: &mut Vec<u16>) -> std::io::Result<()> {
        let width = self.geometry.width as usize;

        self.reader.seek(SeekFrom::Start(0))?;
        for y in 0..self.geometry.height {
            // The last row need not carry its padding.
            let want = if y + 1 == self.geometry.height {
                width * 2
            } else {
                self.stride
            };
            self.reader.read_exact(&mut self.row_buf[..want])?;
            pixels.extend(self.row_buf[..width * 2].chunks_exact(2).map(|b| {
                let px = u16::from_le_bytes([b[0], b[1]]);
                if self.swap_bytes { px.swap_bytes() } else { px }
            }));
        }
        Ok(())
    }
}

/// Empty vector with room for `len` elements, or an allocation error
/// reporting `bytes`.
fn try_buffer<T>(len: usize, bytes: usize) -> Result<Vec<T>, PanelError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| PanelError::Allocation { bytes })?;
    Ok(buf)
}

impl<R: Read + Seek> FrameSource for RawFramebufferSource<R> {
    fn capture(&mut self) -> Result<Frame, PanelError> {
        let count = self.geometry.pixel_count();
        let mut pixels = try_buffer::<u16>(count, count.saturating_mul(2))?;
        self.read_frame(&mut pixels)
            .map_err(|e| PanelError::Capture(format!("framebuffer read failed: {e}")))?;
        Frame::from_pixels(self.geometry, pixels)
    }
}

// ── Tests ────────────────────────────────────────────────────────
