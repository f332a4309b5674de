//! Concrete implementations of the device and decoder seams.
//!
//! - [`MultiFormatDecoder`] - retail barcodes and QR, the default decoder
//! - [`RqrrDecoder`] - pure-Rust QR-only decoding
//! - [`UnavailableDevices`] - camera-less builds; scanning fails with "not found"
//! - [`NokhwaDevices`] - native capture, behind the `camera` feature

mod multi;
#[cfg(feature = "camera")]
mod native;
mod qr;
mod unavailable;

pub use multi::MultiFormatDecoder;
#[cfg(feature = "camera")]
pub use native::{NativeStream, NokhwaDevices};
pub use qr::RqrrDecoder;
pub use unavailable::{NoStream, UnavailableDevices};
