//! Watch command implementation.
//!
//! Subscribes to notifications and prints every reading as it arrives. A lost
//! connection ends the command; there is no automatic reconnect.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Result, bail};
use futures::StreamExt;
use thingy_core::{BleSession, BtleplugBackend, ScanOptions};
use thingy_types::SensorKind;
use tracing::debug;

use super::write_to;
use crate::cli::OutputFormat;
use crate::format::{format_reading_json, format_reading_text};

/// Arguments for the watch command.
pub struct WatchArgs {
    pub kind: SensorKind,
    pub options: ScanOptions,
    pub format: OutputFormat,
    pub count: u32,
    pub quiet: bool,
}

pub async fn cmd_watch(args: WatchArgs) -> Result<()> {
    let WatchArgs {
        kind,
        options,
        format,
        count,
        quiet,
    } = args;

    let session = BleSession::new(Arc::new(BtleplugBackend::new(options)));
    session.configure(kind.descriptor());

    let link = match session.connect().await {
        Ok(link) => link,
        Err(e) => bail!("Failed to connect: {}", e),
    };

    if !quiet {
        eprintln!(
            "Watching: {} ({})",
            link.name().unwrap_or("Unknown"),
            link.address()
        );
        if count > 0 {
            eprintln!("Sensor: {} | Count: {} | Press Ctrl+C to stop", kind, count);
        } else {
            eprintln!("Sensor: {} | Press Ctrl+C to stop", kind);
        }
        eprintln!("{}", "-".repeat(50));
    }

    let mut stdout = io::stdout();
    watch_session(&session, format, count, quiet, &mut stdout).await
}

/// Stream readings from a configured session into `out`.
///
/// The stream is closed and the session disconnected however the loop ends,
/// including when writing to `out` fails.
async fn watch_session<W: Write>(
    session: &BleSession,
    format: OutputFormat,
    count: u32,
    quiet: bool,
    out: &mut W,
) -> Result<()> {
    let kind = match session.descriptor() {
        Some(descriptor) => descriptor.kind(),
        None => bail!("Session not configured"),
    };

    let mut stream = session.stream();
    let mut readings_taken: u32 = 0;

    let outcome = loop {
        if count > 0 && readings_taken >= count {
            if !quiet {
                eprintln!("Completed {} readings.", readings_taken);
            }
            break Ok(());
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                break Ok(());
            }
            item = stream.next() => match item {
                Some(Ok(reading)) => {
                    readings_taken += 1;
                    let written = match format {
                        OutputFormat::Json => format_reading_json(kind, &reading)
                            .and_then(|content| write_to(out, &content)),
                        OutputFormat::Text => write_to(out, &format_reading_text(kind, &reading)),
                    };
                    if let Err(e) = written {
                        break Err(e);
                    }
                }
                Some(Err(e)) => break Err(anyhow::anyhow!("Stream ended: {}", e)),
                None => break Ok(()),
            },
        }
    };

    stream.close();
    if let Err(e) = session.disconnect().await {
        debug!(sensor = %kind, "Disconnect failed: {}", e);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use thingy_core::MockBackend;
    use thingy_types::uuids::TEMPERATURE_CHARACTERISTIC;

    /// A sink whose reader went away.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session() -> (Arc<MockBackend>, BleSession) {
        let backend = Arc::new(MockBackend::new("Thingy"));
        let session = BleSession::new(backend.clone());
        session.configure(SensorKind::Temperature.descriptor());
        (backend, session)
    }

    #[tokio::test]
    async fn test_watch_writes_requested_count() {
        let (backend, session) = session();
        let link = backend.link();
        let feeder = tokio::spawn(async move {
            link.wait_for_listeners(TEMPERATURE_CHARACTERISTIC, 1).await;
            link.notify(TEMPERATURE_CHARACTERISTIC, vec![0x64, 0x00]);
            link.notify(TEMPERATURE_CHARACTERISTIC, vec![0xC8, 0x00]);
        });

        let mut out = Vec::new();
        tokio::time::timeout(
            Duration::from_secs(5),
            watch_session(&session, OutputFormat::Json, 2, true, &mut out),
        )
        .await
        .unwrap()
        .unwrap();
        feeder.await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("\"value\":100.0"));
        assert!(!backend.link().is_connected_sync());
    }

    #[tokio::test]
    async fn test_write_failure_still_disconnects() {
        let (backend, session) = session();
        let link = backend.link();
        let feeder = tokio::spawn(async move {
            link.wait_for_listeners(TEMPERATURE_CHARACTERISTIC, 1).await;
            link.notify(TEMPERATURE_CHARACTERISTIC, vec![0x01, 0x00]);
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            watch_session(&session, OutputFormat::Text, 0, true, &mut BrokenPipe),
        )
        .await
        .unwrap();
        feeder.await.unwrap();

        assert!(result.is_err());
        assert!(!backend.link().is_connected_sync());
        assert!(!session.has_link());
    }
}
