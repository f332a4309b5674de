//! # scanpos-api: Store Backend Client
//!
//! Product lookup and purchase submission over HTTP. Wire types come from
//! `scanpos-core`; this crate only adds transport and error mapping.
//!
//! ```rust,no_run
//! use scanpos_api::{ApiSettings, PosApiClient};
//!
//! # async fn run() -> scanpos_api::ApiResult<()> {
//! let client = PosApiClient::new(&ApiSettings::default())?;
//! let product = client.get_product("4902505130267").await?;
//! println!("{} {}", product.name, product.price);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::PosApiClient;
pub use config::ApiSettings;
pub use error::{ApiClientError, ApiResult};
