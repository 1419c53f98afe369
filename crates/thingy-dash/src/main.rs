use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use thingy_dash::cli::{Cli, Commands};
use thingy_dash::commands::{WatchArgs, cmd_read, cmd_scan, cmd_watch};
use thingy_dash::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let scan_options = config.scan_options(cli.device.clone(), cli.scan_timeout);
    tracing::debug!(?scan_options, "Resolved scan options");

    let quiet = cli.quiet;
    match cli.command {
        None | Some(Commands::Gui { demo: false }) => run_gui(false, cli.config, config, scan_options),
        Some(Commands::Gui { demo: true }) => run_gui(true, cli.config, config, scan_options),
        Some(Commands::Watch {
            sensor,
            format,
            count,
        }) => block_on(cmd_watch(WatchArgs {
            kind: sensor.into(),
            options: scan_options,
            format,
            count,
            quiet,
        })),
        Some(Commands::Read { sensor, format }) => {
            block_on(cmd_read(sensor.into(), scan_options, format, quiet))
        }
        Some(Commands::Scan { format }) => block_on(cmd_scan(scan_options, format, quiet)),
    }
}

/// Run a headless command on a fresh runtime.
///
/// The GUI owns the main thread, so `main` stays synchronous.
fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    tokio::runtime::Runtime::new()?.block_on(future)
}

#[cfg(feature = "gui")]
fn run_gui(
    demo: bool,
    config_path: Option<std::path::PathBuf>,
    config: Config,
    scan_options: thingy_dash::thingy_core::ScanOptions,
) -> Result<()> {
    let options = thingy_dash::gui::GuiOptions { demo, config_path };
    thingy_dash::gui::run(options, config, scan_options)
}

#[cfg(not(feature = "gui"))]
fn run_gui(
    _demo: bool,
    _config_path: Option<std::path::PathBuf>,
    _config: Config,
    _scan_options: thingy_dash::thingy_core::ScanOptions,
) -> Result<()> {
    anyhow::bail!("thingy-dash was built without the `gui` feature; use `watch` or `read`")
}
