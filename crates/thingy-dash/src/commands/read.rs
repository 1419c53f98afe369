//! Read command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use thingy_core::{BleSession, BtleplugBackend, ScanOptions};
use thingy_types::SensorKind;
use tracing::debug;

use super::write_output;
use crate::cli::OutputFormat;
use crate::format::{format_reading_json, format_reading_text};

pub async fn cmd_read(
    kind: SensorKind,
    options: ScanOptions,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let session = BleSession::new(Arc::new(BtleplugBackend::new(options)));
    session.configure(kind.descriptor());

    if !quiet && matches!(format, OutputFormat::Text) {
        eprintln!("Reading {}...", kind.label().to_lowercase());
    }

    let result = session.read_once().await;
    if let Err(e) = session.disconnect().await {
        debug!(sensor = %kind, "Disconnect failed: {}", e);
    }
    let reading = result.with_context(|| format!("Failed to read {}", kind))?;

    let content = match format {
        OutputFormat::Json => format_reading_json(kind, &reading)?,
        OutputFormat::Text => format_reading_text(kind, &reading),
    };
    write_output(&content)
}
