//! ech_status library: ECH and post-quantum key-exchange probing
//!
//! This library probes domains for two modern TLS capabilities: Encrypted
//! Client Hello (advertised via DNS HTTPS records) and post-quantum hybrid
//! key exchange (observed from the group a live TLS 1.3 handshake actually
//! negotiates). Each domain gets a strictly sequential pipeline — existence
//! check, HTTPS-record lookup, ECH extraction and decoding, instrumented
//! handshake — and a terminal [`DomainResult`] verdict; batches run the
//! pipeline concurrently across independent domains.
//!
//! # Example
//!
//! ```no_run
//! use ech_status::{run_probe, Config};
//! use clap::Parser;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! ech_status::initialization::init_crypto_provider();
//! let config = Config::parse_from(["ech_status", "cloudflare.com", "example.com"]);
//! let report = run_probe(config).await?;
//! println!(
//!     "{} of {} domains support ECH",
//!     report.ech_supported, report.total_domains
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

mod app;
pub mod config;
mod dns;
mod domains;
mod ech;
mod error_handling;
pub mod initialization;
mod probe;
mod tls;

// Re-export public API
pub use config::{Config, LogLevel};
pub use dns::{check_domain_exists, lookup_https_records};
pub use domains::load_domains_from_csv;
pub use ech::{decode_ech_config_list, extract_ech, EchError, EchNotFound};
pub use error_handling::{ErrorStats, ErrorType, InitializationError, ProbeError};
pub use probe::{classify, probe_domain, DomainResult};
pub use run::{run_probe, ProbeReport};
pub use tls::{
    build_client_config, is_post_quantum_hybrid, preferred_kx_groups, probe_handshake,
    HandshakeOutcome, KexCapture, KexObserver,
};

// Internal run module (contains the batch orchestration logic)
mod run {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::{bail, Context, Result};
    use futures::stream::FuturesUnordered;
    use futures::StreamExt;
    use log::{info, warn};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::app;
    use crate::config::{Config, DOMAIN_PROBE_TIMEOUT, LOGGING_INTERVAL_SECS};
    use crate::domains::load_domains_from_csv;
    use crate::error_handling::{ErrorStats, ErrorType};
    use crate::initialization::{init_resolver, init_semaphore};
    use crate::probe::{probe_domain, DomainResult};

    /// Results of a probing run.
    ///
    /// Contains summary statistics about the completed batch.
    #[derive(Debug, Clone)]
    pub struct ProbeReport {
        /// Total number of domains probed
        pub total_domains: usize,
        /// Number of domains advertising a usable ECH configuration
        pub ech_supported: usize,
        /// Number of domains that negotiated a post-quantum hybrid group
        pub kyber_supported: usize,
        /// Number of domains whose HTTPS request completed
        pub accessible: usize,
        /// Number of domains that never resolved or timed out outright
        pub failed: usize,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Runs a probe batch with the provided configuration.
    ///
    /// This is the main entry point for the library. Domains come from the
    /// configured CSV file or directly from the config, are probed
    /// concurrently under a fixed-size semaphore, and the per-domain verdicts
    /// are pushed to a single aggregator that prints report lines and tallies
    /// totals. Ordering across domains is first-to-finish; within one domain
    /// the pipeline is strictly sequential.
    ///
    /// No domain's failure aborts the batch: unresolvable domains and
    /// timed-out probes become all-false verdicts and are counted as failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain list is empty or cannot be read, or if
    /// the resolver cannot be initialized.
    pub async fn run_probe(config: Config) -> Result<ProbeReport> {
        let domains = match &config.domains_file {
            Some(path) => load_domains_from_csv(path, config.limit)?,
            None => config.domains.clone(),
        };
        if domains.is_empty() {
            bail!("no domains to probe; pass domains as arguments or use --domains-file");
        }
        let total = domains.len();
        info!("Probing {total} domains with {} workers", config.max_concurrency);

        let resolver = init_resolver().context("Failed to initialize DNS resolver")?;
        let semaphore = init_semaphore(config.max_concurrency);
        let error_stats = Arc::new(ErrorStats::new());

        let completed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let start_time = std::time::Instant::now();

        // Terminal result emission is append-only: every probe task sends its
        // verdict here and a single aggregator consumes them.
        let (tx, mut rx) = mpsc::unbounded_channel::<DomainResult>();
        let aggregator = tokio::spawn(async move {
            let (mut ech, mut kyber, mut accessible) = (0usize, 0usize, 0usize);
            while let Some(result) = rx.recv().await {
                app::report_domain(&result);
                if result.has_ech {
                    ech += 1;
                }
                if result.has_kyber {
                    kyber += 1;
                }
                if result.accessible {
                    accessible += 1;
                }
            }
            (ech, kyber, accessible)
        });

        let cancel = CancellationToken::new();
        let cancel_logging = cancel.child_token();
        let completed_for_logging = Arc::clone(&completed);
        let failed_for_logging = Arc::clone(&failed);
        let logging_task = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(LOGGING_INTERVAL_SECS));
            // The immediate first tick would log an empty progress line.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        app::log_progress(start_time, &completed_for_logging, &failed_for_logging, total);
                    }
                    _ = cancel_logging.cancelled() => {
                        break;
                    }
                }
            }
        });

        let mut tasks = FuturesUnordered::new();
        for domain in domains {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .context("probe semaphore closed")?;

            let resolver = Arc::clone(&resolver);
            let stats = Arc::clone(&error_stats);
            let tx = tx.clone();
            let completed = Arc::clone(&completed);
            let failed = Arc::clone(&failed);

            tasks.push(tokio::spawn(async move {
                let _permit = permit;

                let outcome = tokio::time::timeout(
                    DOMAIN_PROBE_TIMEOUT,
                    probe_domain(&domain, &resolver, &stats),
                )
                .await;

                let result = match outcome {
                    Ok(Ok(result)) => {
                        completed.fetch_add(1, Ordering::SeqCst);
                        result
                    }
                    Ok(Err(e)) => {
                        failed.fetch_add(1, Ordering::SeqCst);
                        warn!("{e:#}");
                        DomainResult::unreachable(domain)
                    }
                    Err(_) => {
                        failed.fetch_add(1, Ordering::SeqCst);
                        stats.increment(ErrorType::ProbeTimeout);
                        warn!(
                            "Probe timeout after {}s for {domain}",
                            DOMAIN_PROBE_TIMEOUT.as_secs()
                        );
                        DomainResult::unreachable(domain)
                    }
                };

                // Sending only fails once the aggregator is gone, at which
                // point the run is already over.
                let _ = tx.send(result);
            }));
        }
        drop(tx);

        while let Some(task_result) = tasks.next().await {
            if let Err(join_error) = task_result {
                failed.fetch_add(1, Ordering::SeqCst);
                warn!("Probe task panicked: {join_error:?}");
            }
        }

        let (ech_supported, kyber_supported, accessible) = aggregator
            .await
            .context("result aggregator task failed")?;

        app::shutdown_gracefully(cancel, Some(logging_task)).await;
        app::log_progress(start_time, &completed, &failed, total);
        app::print_error_statistics(&error_stats);

        Ok(ProbeReport {
            total_domains: total,
            ech_supported,
            kyber_supported,
            accessible,
            failed: failed.load(Ordering::SeqCst),
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }
}
