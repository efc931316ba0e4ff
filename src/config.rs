//! Configuration management for the mining client
//!
//! Supports configuration via command line arguments, environment variables,
//! and configuration files (YAML/JSON) with proper validation and defaults.

use crate::crypto::ScryptParams;
use crate::worker::SearchLimits;
use crate::{BlockHeader, BlockTime, CompactBits, Error, Nonce, Result, Target};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Proof-of-work algorithms supported by the mining client
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Double SHA-256 with midstate reuse
    Sha256d,
    /// Memory-hard scrypt
    Scrypt,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Sha256d => write!(f, "sha256d"),
            Algorithm::Scrypt => write!(f, "scrypt"),
        }
    }
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Complete configuration for the mining client
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(
    name = "pow-mining-client",
    version = env!("CARGO_PKG_VERSION"),
    about = "Proof-of-work mining client",
    long_about = "A from-scratch proof-of-work mining client supporting double-SHA-256 \
                  and scrypt header searches"
)]
pub struct Config {
    /// Print the parsed configuration and exit
    #[arg(long)]
    #[serde(default)]
    pub print_config: bool,

    /// Configuration file path (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Proof-of-work algorithm
    #[arg(short = 'a', long, default_value = "sha256d")]
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,

    /// Block format version
    #[arg(long, default_value = "1")]
    #[serde(default = "default_version")]
    pub block_version: u32,

    /// Previous block hash, reversed display hex
    #[arg(long)]
    pub prev_hash: Option<String>,

    /// Merkle root, reversed display hex
    #[arg(long)]
    pub merkle_root: Option<String>,

    /// Block time (seconds since Unix epoch)
    #[arg(short = 't', long, default_value = "1231379902")]
    #[serde(default = "default_time")]
    pub time: u32,

    /// Compact difficulty encoding, hex
    #[arg(short = 'b', long, default_value = "1d00ffff")]
    #[serde(default = "default_bits")]
    pub bits: String,

    /// Nonce to start the search from
    #[arg(short = 'n', long, default_value = "0")]
    #[serde(default)]
    pub start_nonce: u32,

    /// Number of concurrent mining threads (0 uses all CPUs)
    #[arg(short = 'c', long, default_value = "2")]
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,

    /// How many times the time field may advance once the nonce space is
    /// exhausted
    #[arg(long, default_value = "4294967295")]
    #[serde(default = "default_max_time_increments")]
    pub max_time_increments: u32,

    /// Scrypt CPU/memory cost parameter
    #[arg(long, default_value = "1024")]
    #[serde(default = "default_scrypt_n")]
    pub scrypt_n: usize,

    /// Scrypt block size parameter
    #[arg(long, default_value = "1")]
    #[serde(default = "default_scrypt_r")]
    pub scrypt_r: usize,

    /// Scrypt parallelization parameter
    #[arg(long, default_value = "1")]
    #[serde(default = "default_scrypt_p")]
    pub scrypt_p: usize,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

/// Previous block hash used when none is configured
pub const DEFAULT_PREV_HASH: &str =
    "000000006a625f06636b8bb6ac7b960a8d03705d1ace08b1a19da3fdcc99ddbd";

/// Merkle root used when none is configured
pub const DEFAULT_MERKLE_ROOT: &str =
    "999e1c837c76a1b7fbb7e57baf87b309960f5ffefbf2a9b95dd890602272f644";

impl Config {
    /// Load configuration from CLI, merging a config file if specified
    pub async fn load() -> Result<Self> {
        let mut config = Self::parse();

        if let Some(config_file) = &config.config_file {
            let file_config = Self::load_from_file(config_file).await?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    async fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;

        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(Error::from)
        } else {
            // Default to YAML
            serde_yaml::from_str(&content).map_err(Error::from)
        }
    }

    /// Merge CLI config with file config (CLI takes precedence)
    fn merge_with_file(mut self, file_config: Self) -> Self {
        if self.prev_hash.is_none() {
            self.prev_hash = file_config.prev_hash;
        }
        if self.merkle_root.is_none() {
            self.merkle_root = file_config.merkle_root;
        }
        // For other fields, keep CLI values (they include defaults)
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Both of these must expand cleanly
        self.target()?;
        self.header()?;

        if self.algorithm == Algorithm::Scrypt {
            self.scrypt_params()?;
        }

        Ok(())
    }

    /// Build the initial header from the configured fields
    pub fn header(&self) -> Result<BlockHeader> {
        BlockHeader::from_display_hex(
            self.block_version,
            self.prev_hash.as_deref().unwrap_or(DEFAULT_PREV_HASH),
            self.merkle_root.as_deref().unwrap_or(DEFAULT_MERKLE_ROOT),
            BlockTime::new(self.time),
            self.compact_bits()?,
            Nonce::new(self.start_nonce),
        )
    }

    /// Parsed compact difficulty
    pub fn compact_bits(&self) -> Result<CompactBits> {
        CompactBits::from_str(&self.bits)
    }

    /// Expanded difficulty target
    pub fn target(&self) -> Result<Target> {
        Target::from_compact(self.compact_bits()?)
    }

    /// Validated scrypt cost parameters
    pub fn scrypt_params(&self) -> Result<ScryptParams> {
        ScryptParams::new(self.scrypt_n, self.scrypt_r, self.scrypt_p)
    }

    /// Search bounds derived from the configuration
    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            max_time_increments: self.max_time_increments,
        }
    }
}

// Default value functions for serde
fn default_algorithm() -> Algorithm {
    Algorithm::Sha256d
}
fn default_version() -> u32 {
    1
}
fn default_time() -> u32 {
    1_231_379_902
}
fn default_bits() -> String {
    "1d00ffff".to_string()
}
fn default_thread_count() -> usize {
    2
}
fn default_max_time_increments() -> u32 {
    u32::MAX
}
fn default_scrypt_n() -> usize {
    1024
}
fn default_scrypt_r() -> usize {
    1
}
fn default_scrypt_p() -> usize {
    1
}
fn default_log_level() -> LogLevel {
    LogLevel::Info
}
