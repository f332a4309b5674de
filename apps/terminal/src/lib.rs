//! # ScanPOS Terminal Library
//!
//! Interactive point-of-sale terminal: scan or type a product code, look it
//! up, build a purchase list and check out.
//!
//! ## Module Organization
//! ```text
//! scanpos_terminal/
//! ├── lib.rs          ◄─── You are here (CLI flags, startup, tracing)
//! ├── repl.rs         ◄─── Line parsing, event handling, rendering
//! ├── state/
//! │   ├── cart.rs     ◄─── Purchase list behind a mutex
//! │   ├── lookup.rs   ◄─── Scanned code + pending product
//! │   ├── scanner.rs  ◄─── Scan session controller handle
//! │   └── config.rs   ◄─── scanpos.toml + SCANPOS_* overrides
//! ├── commands/
//! │   ├── scan.rs     ◄─── scan, stop, code, sample, permission
//! │   ├── product.rs  ◄─── lookup
//! │   ├── cart.rs     ◄─── add, qty, remove, clear
//! │   └── purchase.rs ◄─── checkout
//! └── error.rs        ◄─── ApiError for every command
//! ```

pub mod commands;
pub mod error;
pub mod repl;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use scanpos_api::PosApiClient;
use scanpos_scan::ChannelEmitter;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use error::ApiError;
use repl::Repl;
use state::{AppConfig, ScannerState};

/// Process flags.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "scanpos-terminal", version, about = "Scan barcodes and QR codes into a purchase list")]
pub struct Cli {
    /// Config file (default: the platform config dir's scanpos.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Store backend URL, overriding the config file and SCANPOS_API_URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Tracing filter, overriding RUST_LOG
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

/// Resolves the effective configuration for `cli`.
///
/// An explicitly named config file must load; the default location falls
/// back to defaults with a warning.
pub fn load_config(cli: &Cli) -> Result<AppConfig, ApiError> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(Some(path.clone()))?,
        None => AppConfig::load_or_default(None),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Runs the terminal on stdin/stdout until the cashier quits.
///
/// ## Startup Sequence
/// ```text
/// 1. Load config (file → env → --api-url), validate
/// 2. Build the store API client
/// 3. Build the scanner with a channel emitter
/// 4. Check camera permission (never prompts)
/// 5. Hand stdin and the event channel to the REPL
/// ```
pub async fn run(cli: Cli) -> Result<(), ApiError> {
    info!("Starting ScanPOS terminal");

    let config = load_config(&cli)?;
    info!(api = %config.api.base_url, "Configuration loaded");

    let api = PosApiClient::new(&config.api)?;
    let (emitter, events) = ChannelEmitter::new();
    let scanner = ScannerState::open(&config.scanner, Arc::new(emitter))?;

    let permission = commands::scan::check_permission(&scanner).await;
    info!(%permission, "Camera permission checked");

    let repl = Repl::new(config, api, scanner);
    println!("ScanPOS terminal. Type `help` for commands, `scan` to start the camera.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    repl.run(stdin, events, &mut stdout)
        .await
        .map_err(|e| ApiError::internal(format!("Terminal I/O failed: {}", e)))?;

    info!("ScanPOS terminal stopped");
    Ok(())
}

/// Initializes the tracing subscriber on stderr.
///
/// Priority: `--log-filter`, then `RUST_LOG`, then `info,scanpos=debug`.
pub fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,scanpos=debug")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
