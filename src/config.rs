//! Runtime configuration: CLI options and tuning constants.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

// constants (used as defaults)

/// Number of concurrent probe workers.
pub const DEFAULT_MAX_CONCURRENCY: usize = 12;
/// Default cap on domains read from a CSV file.
pub const DEFAULT_DOMAIN_LIMIT: usize = 10_000;
/// Cap applied when a caller passes a zero limit to the CSV loader.
pub const FALLBACK_DOMAIN_LIMIT: usize = 100;
/// Seconds between progress log lines.
pub const LOGGING_INTERVAL_SECS: u64 = 5;

// Network operation timeouts
/// DNS query timeout in seconds.
pub const DNS_TIMEOUT_SECS: u64 = 10;
/// Bound on the whole TLS probe exchange (TCP connect, handshake, GET,
/// response head) for one domain.
pub const HANDSHAKE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Outer bound on one domain's full pipeline, DNS included.
pub const DOMAIN_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace). Used with the `--log-level` CLI option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Normal operational output (default).
    Info,
    /// Per-stage diagnostics, including expected ECH absence.
    Debug,
    /// Everything.
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Command-line options and configuration.
///
/// This struct is automatically generated by `clap` from the field attributes.
///
/// # Examples
///
/// ```bash
/// # Probe a couple of domains given on the command line
/// ech_status cloudflare.com example.com
///
/// # Probe the first 500 domains of a popularity list
/// ech_status --domains-file top-domains.csv --limit 500
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ech_status",
    about = "Checks domains for ECH and post-quantum key exchange support."
)]
pub struct Config {
    /// Domains to probe
    #[arg(value_parser)]
    pub domains: Vec<String>,

    /// Check against a list of domains from a CSV file (first column, header skipped)
    #[arg(short = 't', long, value_parser)]
    pub domains_file: Option<PathBuf>,

    /// Maximum number of domains read from the CSV file
    #[arg(long, default_value_t = DEFAULT_DOMAIN_LIMIT)]
    pub limit: usize,

    /// Maximum concurrent probes
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Print more information (shorthand for --log-level debug)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Effective log level, with `--verbose` taking precedence over
    /// `--log-level`.
    pub fn effective_log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            self.log_level.clone().into()
        }
    }
}
