//! Configuration module for Board-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every harvest parameter (boards, batch size, scroll thresholds, extraction
//! chains) arrives through the `Config` value; nothing is held in globals.
//!
//! # Example
//!
//! ```no_run
//! use board_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting {} boards", config.boards.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BoardEntry, Config, DriverConfig, DriverKind, ExtractConfig, HarvestSettings, KeywordConfig,
    OutputConfig, PauseRange, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
