//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use thingy_types::SensorKind;

/// Output format for headless commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Sensor selection on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SensorArg {
    /// Temperature characteristic
    Temperature,
    /// Rotary/orientation characteristic
    Rotary,
}

impl From<SensorArg> for SensorKind {
    fn from(arg: SensorArg) -> Self {
        match arg {
            SensorArg::Temperature => SensorKind::Temperature,
            SensorArg::Rotary => SensorKind::Rotary,
        }
    }
}

#[derive(Parser)]
#[command(name = "thingy-dash")]
#[command(author, version, about = "Live dashboard for Thingy BLE sensor tags", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Device name or address, or use THINGY_DEVICE env var
    #[arg(short, long, global = true, env = "THINGY_DEVICE")]
    pub device: Option<String>,

    /// How long to scan for the device, in seconds
    #[arg(long, global = true)]
    pub scan_timeout: Option<u64>,

    /// Defaults to `gui` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the live dashboard (default)
    Gui {
        /// Feed the dashboard from a simulated tag instead of Bluetooth
        #[arg(long)]
        demo: bool,
    },

    /// Stream readings from one sensor until interrupted
    Watch {
        /// Sensor to stream
        #[arg(short, long, value_enum)]
        sensor: SensorArg,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Stop after this many readings (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,
    },

    /// Read one sensor once
    Read {
        /// Sensor to read
        #[arg(short, long, value_enum)]
        sensor: SensorArg,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List nearby peripherals and whether they expose the sensor service
    Scan {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
