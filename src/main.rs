//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `ech_status` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - Crypto provider initialization
//! - User-facing summary output
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use ech_status::initialization::{init_crypto_provider, init_logger};
use ech_status::{run_probe, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments into Config
    let config = Config::parse();

    // Initialize logger based on config
    init_logger(config.effective_log_level()).context("Failed to initialize logger")?;

    // Initialize crypto provider for TLS operations
    init_crypto_provider();

    // Run the probe batch using the library
    match run_probe(config).await {
        Ok(report) => {
            // Totals only make sense for batch runs
            if report.total_domains > 1 {
                println!("Total domains: {}", report.total_domains);
                println!("Total support ECH: {}", report.ech_supported);
                println!("Total support Kyber: {}", report.kyber_supported);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("ech_status error: {:#}", e);
            process::exit(1);
        }
    }
}
