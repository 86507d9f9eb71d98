// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # dendra-observability
//!
//! Logging setup shared by every Dendra binary, with per-crate debug flag
//! support.
//!
//! ## Features
//! - `file-logging`: JSON log files in a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known Dendra crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "dendra-config",
    "dendra-cell-neural",
    "dendra-cell-engine",
    "current-sweep",
];
