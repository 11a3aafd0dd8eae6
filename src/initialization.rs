//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - Logger
//! - DNS resolver
//! - Concurrency semaphore
//! - rustls crypto provider
//!
//! All initialization functions return proper error types for error handling.

use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use log::LevelFilter;
use rustls::crypto::{aws_lc_rs, CryptoProvider};
use tokio::sync::Semaphore;

use crate::error_handling::InitializationError;

/// Initializes the logger at the given level.
///
/// Respects `RUST_LOG` when set, so individual module levels can still be
/// tuned without touching the CLI flags.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger was already
/// installed.
pub fn init_logger(level: LevelFilter) -> Result<(), InitializationError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
        .try_init()?;
    Ok(())
}

/// Initializes a semaphore for controlling concurrency.
///
/// Creates a new semaphore with the specified permit count. This semaphore is
/// used to limit the number of concurrently probed domains.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}

/// Initializes the DNS resolver used by every probe stage.
///
/// Prefers the system configuration (`/etc/resolv.conf`), falling back to the
/// default public configuration when it cannot be read. Each query is
/// attempted exactly once; retry policy belongs to callers, and the probing
/// pipeline deliberately has none.
///
/// # Errors
///
/// Returns `InitializationError::DnsResolverError` if neither the system nor
/// the fallback configuration can be applied (the fallback should rarely
/// fail).
pub fn init_resolver() -> Result<Arc<TokioAsyncResolver>, InitializationError> {
    let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
        Ok((config, opts)) => (config, opts),
        Err(e) => {
            log::warn!("Failed to read system resolver config, using defaults: {e}");
            (ResolverConfig::default(), ResolverOpts::default())
        }
    };

    opts.timeout = Duration::from_secs(crate::config::DNS_TIMEOUT_SECS);
    // One shot per query; a failed lookup is a verdict, not a transient to
    // paper over.
    opts.attempts = 1;
    // Domains are already fully qualified; never append search domains.
    opts.ndots = 0;

    Ok(Arc::new(TokioAsyncResolver::tokio(config, opts)))
}

/// Initializes the process-wide crypto provider for TLS operations.
///
/// Installs the aws-lc-rs provider, which carries the X25519MLKEM768 hybrid
/// key-exchange group and the HPKE suites needed for ECH. Must be called
/// before any TLS connections are established. Per-probe configurations are
/// built from their own provider instance; the default install only covers
/// incidental rustls users.
pub fn init_crypto_provider() {
    // The return value is ignored because reinstalling the provider is harmless
    let _ = CryptoProvider::install_default(aws_lc_rs::default_provider());
}
