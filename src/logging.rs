//! Tracing subscriber setup for the binary.
//!
//! Logs go to stderr; stdout is reserved for the CSV report. `RUST_LOG`
//! overrides the default filter unless `verbose` is set.

use std::io::IsTerminal;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const CRATE_TARGET: &str = "ledger_executor";

pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(format!("{CRATE_TARGET}=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{CRATE_TARGET}=info,warn")))
    };

    let stderr = std::io::stderr();
    let ansi = stderr.is_terminal();
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(ansi),
        )
        .with(filter)
        .init();
}
