//! # panelcast: screen-to-panel mirror daemon
//!
//! Reads raw RGB565 frames from a framebuffer device, diffs them with
//! `panelcast-core`, and pushes the minimal update to a panel controller
//! attached over a serial link.
//!
//! ## Modes
//!
//! - **Partial** (default): send only the changed rectangle when that pays off.
//! - **Constant**: stream every frame in full.
//! - **Dry run** (`--dry-run`): apply updates to an in-memory panel instead
//!   of the serial link.

pub mod capture;
pub mod config;
pub mod daemon;
pub mod link;
