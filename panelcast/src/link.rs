//! Serial link to the panel controller.
//!
//! The panel sits behind a small microcontroller that owns the D/C line
//! and the SPI clock. The host sends it a stream of packets:
//!
//! ## Wire format
//!
//! ```text
//! tag:      u8   (0 = command, 1 = pixel data)
//! len:      u32  (little-endian payload length)
//! payload:  [u8] (command: opcode then parameters; data: raw pixel bytes)
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use panelcast_core::{PanelBus, PanelError};

/// Packet tag for a controller command.
pub const TAG_COMMAND: u8 = 0;
/// Packet tag for pixel data.
pub const TAG_DATA: u8 = 1;

/// [`PanelBus`] over any byte sink.
pub struct SerialLink<W> {
    writer: W,
    bytes_written: u64,
}

impl SerialLink<std::fs::File> {
    /// Open the serial device at `path` for writing.
    pub fn open(path: &Path) -> Result<Self, PanelError> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| PanelError::Transport(format!("open {}: {e}", path.display())))?;
        Ok(Self::new(file))
    }
}

impl<W: Write> SerialLink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
        }
    }

    /// Total bytes sent, framing included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn send(&mut self, tag: u8, parts: &[&[u8]]) -> std::io::Result<()> {
        let len: usize = parts.iter().map(|p| p.len()).sum();
        let len = u32::try_from(len).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "packet too large")
        })?;

        self.writer.write_all(&[tag])?;
        self.writer.write_all(&len.to_le_bytes())?;
        for part in parts {
            self.writer.write_all(part)?;
        }
        self.writer.flush()?;
        self.bytes_written += 5 + u64::from(len);
        Ok(())
    }
}

impl<W: Write> PanelBus for SerialLink<W> {
    fn command(&mut self, cmd: u8, params: &[u8]) -> Result<(), PanelError> {
        let opcode = [cmd];
        self.send(TAG_COMMAND, &[&opcode[..], params])
            .map_err(|e| PanelError::Transport(format!("command {cmd:#04x}: {e}")))
    }

    fn write_pixels(&mut self, data: &[u8]) -> Result<(), PanelError> {
        self.send(TAG_DATA, &[data])
            .map_err(|e| PanelError::Transport(format!("pixel write: {e}")))
    }
}

// ── Tests ────────────────────────────────────────────────────────
