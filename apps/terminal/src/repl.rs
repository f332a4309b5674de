//! # Interactive Loop
//!
//! Reads one command per line and reacts to scanner events between lines.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Repl::run                                       │
//! │                                                                         │
//! │   select! (biased)                                                      │
//! │   ├── scanner event ──► CodeDetected ──► lookup_product ──► print       │
//! │   │                     Error        ──► print                          │
//! │   ├── stdin line ─────► parse_line ──► execute ──► print                │
//! │   └── Ctrl-C ─────────► quit                                            │
//! │                                                                         │
//! │   Events are drained before the next line so a typed `code` is looked   │
//! │   up before whatever the cashier typed after it.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::Write;

use clap::{Parser, Subcommand};
use scanpos_api::PosApiClient;
use scanpos_core::{CameraPermissionState, Product, PurchaseResult, Yen};
use scanpos_scan::backends::MultiFormatDecoder;
use scanpos_scan::{FrameDecoder, MediaDevices, ScanEvent, ScanStatus};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::commands::cart::{self, CartView};
use crate::commands::{product, purchase, scan};
use crate::error::ApiError;
use crate::state::{AppConfig, CartState, DefaultDevices, LookupState, ScannerState};

// =============================================================================
// Command Grammar
// =============================================================================

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_help_flag = true, disable_help_subcommand = true)]
struct ReplLine {
    #[command(subcommand)]
    command: ReplCommand,
}

/// One cashier command.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ReplCommand {
    /// Open the camera and scan until a code is confirmed
    Scan,
    /// Stop scanning
    Stop,
    /// Enter a code by hand
    Code {
        /// Rest of the line, spacing kept
        #[arg(required = true, allow_hyphen_values = true)]
        text: String,
    },
    /// Enter the sample product code
    Sample,
    /// Show scanner status
    Status,
    /// Re-check camera permission
    Permission,
    /// Ask for camera access
    Allow,
    /// Add the looked-up product to the purchase list
    Add {
        #[arg(allow_negative_numbers = true)]
        quantity: Option<i64>,
    },
    /// Show the purchase list
    Cart,
    /// Change the quantity of a line
    Qty {
        code: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { code: String },
    /// Empty the purchase list
    Clear,
    /// Check out the purchase list
    Purchase { employee_code: Option<String> },
    Help,
    #[command(alias = "exit")]
    Quit,
}

/// Parses a REPL line. Blank lines yield `Ok(None)`.
///
/// Everything after `code` is passed on as one argument, so a typed code is
/// only trimmed, never re-spaced.
pub fn parse_line(line: &str) -> Result<Option<ReplCommand>, clap::Error> {
    let line = line.trim();
    let (first, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    if first.is_empty() {
        return Ok(None);
    }

    let rest = rest.trim();
    let words: Vec<&str> = if first == "code" {
        std::iter::once(first).chain((!rest.is_empty()).then_some(rest)).collect()
    } else {
        line.split_whitespace().collect()
    };
    ReplLine::try_parse_from(words).map(|parsed| Some(parsed.command))
}

const HELP: &str = "\
Scanning
  scan                 open the camera and scan a barcode or QR code
  stop                 stop scanning
  code <CODE>          enter a code by hand
  sample               try the flow with the sample code
  status               scanner status
  permission           re-check camera permission
  allow                ask for camera access
Purchase list
  add [QTY]            add the looked-up product (default 1)
  cart                 show the purchase list
  qty <CODE> <QTY>     change a quantity
  remove <CODE>        remove a line
  clear                empty the list
  purchase [EMPLOYEE]  check out
Other
  help                 this text
  quit                 leave";

// =============================================================================
// Repl
// =============================================================================

/// What the loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Print(String),
    Quit,
}

pub struct Repl<M: MediaDevices = DefaultDevices, D: FrameDecoder = MultiFormatDecoder> {
    config: AppConfig,
    api: PosApiClient,
    cart: CartState,
    lookup: LookupState,
    scanner: ScannerState<M, D>,
}

impl<M: MediaDevices, D: FrameDecoder> Repl<M, D> {
    pub fn new(config: AppConfig, api: PosApiClient, scanner: ScannerState<M, D>) -> Self {
        Repl {
            config,
            api,
            cart: CartState::new(),
            lookup: LookupState::new(),
            scanner,
        }
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    pub fn lookup(&self) -> &LookupState {
        &self.lookup
    }

    /// Runs until `quit`, end of input or Ctrl-C. Stops scanning on exit.
    pub async fn run<R, W>(
        &self,
        input: R,
        mut events: UnboundedReceiver<ScanEvent>,
        out: &mut W,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        let mut events_open = true;

        loop {
            tokio::select! {
                biased;
                event = events.recv(), if events_open => {
                    match event {
                        Some(event) => {
                            let text = self.handle_event(event).await;
                            writeln!(out, "{}", text)?;
                        }
                        None => events_open = false,
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("Input closed");
                        break;
                    };
                    match self.dispatch(&line).await {
                        Outcome::Print(text) if text.is_empty() => {}
                        Outcome::Print(text) => writeln!(out, "{}", text)?,
                        Outcome::Quit => break,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    debug!("Interrupted");
                    break;
                }
            }
            out.flush()?;
        }

        scan::stop_scan(&self.scanner);
        Ok(())
    }

    /// Parses and executes one line, rendering errors as text.
    pub async fn dispatch(&self, line: &str) -> Outcome {
        match parse_line(line) {
            Ok(None) => Outcome::Print(String::new()),
            Ok(Some(command)) => match self.execute(command).await {
                Ok(outcome) => outcome,
                Err(err) => Outcome::Print(format!("Error: {}", err.message)),
            },
            Err(err) => Outcome::Print(format!("{}Type `help` for commands.", err.render())),
        }
    }

    pub async fn execute(&self, command: ReplCommand) -> Result<Outcome, ApiError> {
        let text = match command {
            ReplCommand::Scan => {
                let scanner = self.scanner.clone();
                tokio::spawn(async move {
                    // Failures were already delivered as scanner events.
                    if let Err(err) = scan::start_scan(&scanner).await {
                        debug!(error = %err, "Scan session did not start");
                    }
                });
                "Starting camera... hold the code steady in front of it.".to_string()
            }
            ReplCommand::Stop => {
                scan::stop_scan(&self.scanner);
                "Scanning stopped.".to_string()
            }
            ReplCommand::Code { text } => {
                let code = scan::submit_code(&self.scanner, &text)?;
                format!("Code entered: {}", code)
            }
            ReplCommand::Sample => {
                let code = scan::submit_sample(&self.scanner)?;
                format!("Sample code entered: {}", code)
            }
            ReplCommand::Status => render_status(&scan::scan_status(&self.scanner)),
            ReplCommand::Permission => {
                let state = scan::check_permission(&self.scanner).await;
                render_permission(state)
            }
            ReplCommand::Allow => {
                let state = scan::request_permission(&self.scanner).await?;
                render_permission(state)
            }
            ReplCommand::Add { quantity } => {
                let view = cart::add_pending_to_cart(&self.cart, &self.lookup, quantity)?;
                format!("Added.\n{}", self.render_cart(&view))
            }
            ReplCommand::Cart => self.render_cart(&cart::get_cart(&self.cart)),
            ReplCommand::Qty { code, quantity } => {
                let view = cart::update_cart_item(&self.cart, &code, quantity)?;
                self.render_cart(&view)
            }
            ReplCommand::Remove { code } => {
                let view = cart::remove_from_cart(&self.cart, &code)?;
                self.render_cart(&view)
            }
            ReplCommand::Clear => {
                let view = cart::clear_cart(&self.cart);
                self.render_cart(&view)
            }
            ReplCommand::Purchase { employee_code } => {
                let employee_code =
                    employee_code.unwrap_or_else(|| self.config.terminal.employee_code.clone());
                let result =
                    purchase::submit_purchase(&self.api, &self.cart, &self.lookup, &employee_code).await?;
                self.render_purchase(&result)
            }
            ReplCommand::Help => HELP.to_string(),
            ReplCommand::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Print(text))
    }

    /// Reacts to a scanner event. A detected code is looked up right away.
    pub async fn handle_event(&self, event: ScanEvent) -> String {
        match event {
            ScanEvent::CodeDetected(code) => {
                match product::lookup_product(&self.api, &self.lookup, &code).await {
                    Ok(Some(product)) => format!("Scanned {}\n{}", code, self.render_product(&product)),
                    Ok(None) => format!("Scanned {} (superseded by a newer code)", code),
                    Err(err) => {
                        warn!(code = %code, error = %err, "Product lookup failed");
                        format!("Scanned {}\nError: {}", code, err.message)
                    }
                }
            }
            ScanEvent::Error(message) => format!("Scanner error: {}", message),
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn amount(&self, amount: Yen) -> String {
        self.config.format_amount(amount)
    }

    fn render_product(&self, product: &Product) -> String {
        let stock = match product.stock {
            Some(n) if n > 0 => format!("{} in stock", n),
            _ => "out of stock".to_string(),
        };
        let hint = if product.is_in_stock() {
            format!("Type `add [1-{}]` to put it on the purchase list.", product.quantity_limit())
        } else {
            "It cannot be added to the purchase list.".to_string()
        };
        format!(
            "  {}  {}  ({})\n  {}",
            product.name,
            self.amount(Yen::new(product.price)),
            stock,
            hint
        )
    }

    fn render_cart(&self, view: &CartView) -> String {
        if view.items.is_empty() {
            return "Purchase list is empty.".to_string();
        }
        let mut text = String::from("Purchase list:");
        for item in &view.items {
            text.push_str(&format!(
                "\n  {:<24} {:>4} x {:>8} = {:>10}  [{}]",
                item.product.name,
                item.quantity,
                self.amount(item.unit_price()),
                self.amount(item.line_total()),
                item.code()
            ));
        }
        text.push_str(&format!(
            "\n  {} lines, {} items, total {}",
            view.totals.item_count,
            view.totals.total_quantity,
            self.amount(view.totals.total_amount)
        ));
        text
    }

    fn render_purchase(&self, result: &PurchaseResult) -> String {
        format!(
            "Purchase complete.\n  transaction {}\n  total {}\n  at {}",
            result.transaction_id,
            self.amount(Yen::new(result.total_amount)),
            result.timestamp
        )
    }
}

fn render_permission(state: CameraPermissionState) -> String {
    match state {
        CameraPermissionState::Granted => "Camera access: granted".to_string(),
        CameraPermissionState::Denied => {
            "Camera access: denied. Allow camera access in your system settings, or enter codes with `code <CODE>`."
                .to_string()
        }
        CameraPermissionState::Prompt => "Camera access: not decided yet. Type `allow` to ask.".to_string(),
        CameraPermissionState::Unknown => "Camera access: unknown. Type `allow` to ask.".to_string(),
    }
}

fn render_status(status: &ScanStatus) -> String {
    let mut text = format!(
        "Scanner: {}\n  permission {}\n  video {}\n  attempts {} (skipped {}, errors {})\n  interval {} ms",
        status.phase,
        status.permission,
        if status.video_ready { "ready" } else { "not ready" },
        status.attempt_count,
        status.skipped_count,
        status.error_count,
        status.current_interval_ms
    );
    if let Some(value) = &status.last_detected_value {
        text.push_str(&format!("\n  reading {} ({} matches)", value, status.consecutive_matches));
    }
    if status.reconnects > 0 {
        text.push_str(&format!("\n  reconnects {}", status.reconnects));
    }
    if let Some(err) = &status.last_error {
        text.push_str(&format!("\n  last error: {}", err));
    }
    text
}
