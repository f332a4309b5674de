//! # ScanPOS Terminal Entry Point
//!
//! ```text
//! 1. Parse flags
//! 2. Initialize tracing (stderr)
//! 3. Run the REPL (see lib.rs)
//! ```

use std::process::ExitCode;

use clap::Parser;
use scanpos_terminal::{init_tracing, run, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_filter.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("scanpos-terminal: {}", err.message);
            ExitCode::FAILURE
        }
    }
}
