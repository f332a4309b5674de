//! # State Module
//!
//! Application state for the terminal, split by concern so each command
//! takes only what it touches.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐ ┌──────────────┐   │
//! │  │  CartState   │ │ LookupState  │ │ ScannerState │ │  AppConfig   │   │
//! │  │              │ │              │ │              │ │              │   │
//! │  │  Arc<Mutex<  │ │ scanned code │ │ Arc<Scan     │ │ [api]        │   │
//! │  │    Cart>>    │ │ + pending    │ │  Session     │ │ [scanner]    │   │
//! │  │              │ │   product    │ │  Controller> │ │ [terminal]   │   │
//! │  └──────────────┘ └──────────────┘ └──────────────┘ └──────────────┘   │
//! │                                                                         │
//! │  AppConfig is read-only after startup.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod config;
mod lookup;
mod scanner;

pub use cart::CartState;
pub use config::{AppConfig, ConfigError, ConfigResult, TerminalSettings};
pub use lookup::{Lookup, LookupState};
pub use scanner::{DefaultDevices, ScannerState};
