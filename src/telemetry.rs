// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Logging setup.
//!
//! Respects `RUST_LOG` if set, otherwise logs at `info`. Output is either
//! compact text with ANSI colors or one JSON object per line.
//!
//! ```text
//! 2025-11-29T23:45:00.123456Z INFO pipeline/mod.rs:178 Starting reconciliation pass cluster=abc12 pass=create
//! ```

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable, compact
    #[default]
    Text,
    /// Structured JSON
    Json,
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_ansi(true).compact().try_init(),
    }
    .map_err(|e| anyhow!(e))
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod telemetry_tests;
