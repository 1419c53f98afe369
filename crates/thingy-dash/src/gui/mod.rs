//! Native desktop dashboard built with [egui](https://www.egui.rs/).
//!
//! ```bash
//! thingy-dash            # same as `thingy-dash gui`
//! thingy-dash gui --demo # simulated tag, no Bluetooth needed
//! ```

mod app;
mod components;
pub mod demo;
mod theme;

use std::path::PathBuf;

use anyhow::{Context, Result};
use eframe::egui;
use thingy_core::ScanOptions;
use tracing::info;

use crate::config::Config;

pub use app::DashApp;
pub use theme::{Theme, ThemeMode};

/// Default window size when the config does not set one.
const DEFAULT_SIZE: [f32; 2] = [800.0, 720.0];

/// Options for running the dashboard.
#[derive(Debug, Default, Clone)]
pub struct GuiOptions {
    /// Feed the dashboard from a simulated tag.
    pub demo: bool,
    /// Config file to write preferences back to. `None` uses the default path.
    pub config_path: Option<PathBuf>,
}

/// Run the dashboard on the calling thread until the window closes.
///
/// BLE work runs on a tokio runtime owned by the app; the UI thread never
/// blocks on it.
pub fn run(options: GuiOptions, config: Config, scan_options: ScanOptions) -> Result<()> {
    if options.demo {
        info!("Running in demo mode with simulated data");
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let size = [
        config.gui.window_width.unwrap_or(DEFAULT_SIZE[0]),
        config.gui.window_height.unwrap_or(DEFAULT_SIZE[1]),
    ];
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size(size)
        .with_min_inner_size([600.0, 400.0])
        .with_title("Thingy Dashboard");

    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let GuiOptions { demo, config_path } = options;
    eframe::run_native(
        "Thingy Dashboard",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(DashApp::new(
                cc,
                runtime,
                config,
                config_path,
                scan_options,
                demo,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run eframe: {}", e))?;

    Ok(())
}
