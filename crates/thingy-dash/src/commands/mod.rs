//! Command implementations for the headless subcommands.

mod read;
mod scan;
mod watch;

use std::io::{self, Write};

use anyhow::Result;

pub use read::cmd_read;
pub use scan::cmd_scan;
pub use watch::{WatchArgs, cmd_watch};

/// Print to stdout and flush so piped consumers see each line immediately.
pub(crate) fn write_output(content: &str) -> Result<()> {
    write_to(&mut io::stdout().lock(), content)
}

pub(crate) fn write_to<W: Write>(out: &mut W, content: &str) -> Result<()> {
    out.write_all(content.as_bytes())?;
    out.flush()?;
    Ok(())
}
