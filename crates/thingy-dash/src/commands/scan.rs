//! Scan command implementation.

use anyhow::{Context, Result};
use thingy_core::ScanOptions;
use thingy_core::scan::scan_for_devices;
use thingy_core::uuids::SENSOR_SERVICE;

use super::write_output;
use crate::cli::OutputFormat;
use crate::format::{format_scan_json, format_scan_text};

pub async fn cmd_scan(options: ScanOptions, format: OutputFormat, quiet: bool) -> Result<()> {
    if !quiet && matches!(format, OutputFormat::Text) {
        eprintln!("Scanning for {}s...", options.duration.as_secs());
    }

    let devices = scan_for_devices(SENSOR_SERVICE, &options)
        .await
        .context("Failed to scan for devices")?;

    let content = match format {
        OutputFormat::Json => format_scan_json(&devices)?,
        OutputFormat::Text => format_scan_text(&devices),
    };
    write_output(&content)
}
