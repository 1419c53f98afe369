//! Live dashboard for Thingy BLE sensor tags.
//!
//! Connects to a tag exposing the sensor service and shows two sensors side
//! by side: temperature as a rolling time-series chart and the rotary
//! characteristic as a pie gauge out of 360.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gui` | Open the dashboard (default) |
//! | `watch` | Stream one sensor to stdout |
//! | `read` | Read one sensor once |
//! | `scan` | List nearby peripherals |
//!
//! # Configuration
//!
//! Settings live in `~/.config/thingy-dash/config.toml` (or the platform
//! equivalent):
//!
//! ```toml
//! device = "Thingy"
//! scan_timeout = 10
//!
//! [behavior]
//! auto_connect = true
//!
//! [gui]
//! theme = "dark"
//! chart_window_secs = 30
//! ```
//!
//! # Environment Variables
//!
//! - `THINGY_DEVICE`: Device name or address (overridden by `--device`)
//! - `RUST_LOG`: Log filter when neither `--verbose` nor `--quiet` is given
//!
//! # Examples
//!
//! ```bash
//! thingy-dash --device Thingy
//! thingy-dash watch --sensor temperature --format json
//! thingy-dash read --sensor rotary
//! ```

pub mod chart;
pub mod cli;
pub mod commands;
pub mod config;
pub mod format;
pub mod panel;

#[cfg(feature = "gui")]
pub mod gui;

// Re-export core dependencies for convenience
pub use thingy_core;
pub use thingy_types;
