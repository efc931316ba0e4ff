//! Proof-of-Work Mining Client
//!
//! A from-scratch proof-of-work stack and the search loops on top of it:
//! - SHA-256 with a midstate API for prefix reuse
//! - Generic HMAC and single-iteration PBKDF2
//! - Memory-hard scrypt with parallel chunk mixing
//! - Double-SHA-256 and scrypt header searches with nonce-space partitioning
//!   and cooperative cancellation

pub mod config;
pub mod crypto;
pub mod error;
pub mod header;
pub mod types;
pub mod utils;
pub mod worker;

pub use config::{Algorithm, Config};
pub use error::{Error, Result};
pub use header::BlockHeader;
pub use types::*;

/// Application information
pub const APP_NAME: &str = "pow-mining-client";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
