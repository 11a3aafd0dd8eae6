use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use hickory_resolver::error::ResolveError;
use log::SetLoggerError;
use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the DNS resolver.
    #[error("DNS resolver initialization error: {0}")]
    #[allow(dead_code)] // Reserved for future use if fallback fails
    DnsResolverError(String),
}

/// Hard per-domain probe failure.
///
/// Only total unreachability is surfaced to the orchestrator; every other
/// anomaly degrades into a still-complete [`crate::DomainResult`].
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The preliminary A-record lookup failed, so the domain does not resolve
    /// at all and the rest of the pipeline was skipped.
    #[error("domain {domain} did not resolve: {source}")]
    Unresolvable {
        /// The domain that was probed.
        domain: String,
        /// The DNS failure that triggered the short-circuit.
        #[source]
        source: ResolveError,
    },
}

/// Types of errors that can occur while probing a domain.
///
/// This enum categorizes failure modes in the probing pipeline for tracking
/// and reporting purposes. ECH absence is deliberately not represented here:
/// a domain without an `ech=` parameter is the normal case, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    /// Preliminary A-record lookup failed.
    DnsExistenceLookupError,
    /// HTTPS-record lookup failed or returned a non-success code.
    DnsHttpsLookupError,
    /// The `ech=` parameter value was not valid base64.
    EchBase64DecodeError,
    /// The decoded ECH bytes were not a valid config list.
    EchUnmarshalError,
    /// The TLS probe (connect, handshake, or request) failed.
    TlsHandshakeError,
    /// The whole per-domain pipeline exceeded its outer timeout.
    ProbeTimeout,
}

impl ErrorType {
    /// Human-readable label for statistics output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::DnsExistenceLookupError => "DNS existence lookup error",
            ErrorType::DnsHttpsLookupError => "DNS HTTPS lookup error",
            ErrorType::EchBase64DecodeError => "ECH base64 decode error",
            ErrorType::EchUnmarshalError => "ECH config unmarshal error",
            ErrorType::TlsHandshakeError => "TLS handshake error",
            ErrorType::ProbeTimeout => "Probe timeout",
        }
    }
}

/// Thread-safe error statistics tracker.
///
/// Tracks the count of each error type using atomic counters, allowing
/// concurrent access from multiple probe tasks. All error types are
/// initialized to zero on creation.
pub struct ErrorStats {
    errors: HashMap<ErrorType, AtomicUsize>,
}

impl ErrorStats {
    /// Creates a tracker with every counter at zero.
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for error in ErrorType::iter() {
            errors.insert(error, AtomicUsize::new(0));
        }
        ErrorStats { errors }
    }

    /// Increments the counter for `error`.
    pub fn increment(&self, error: ErrorType) {
        // All ErrorType variants are initialized in new(), so unwrap() is safe
        self.errors
            .get(&error)
            .unwrap()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Current count for `error`.
    pub fn get_count(&self, error: ErrorType) -> usize {
        // All ErrorType variants are initialized in new(), so unwrap() is safe
        self.errors.get(&error).unwrap().load(Ordering::SeqCst)
    }

    /// Sum of all counters.
    pub fn total(&self) -> usize {
        ErrorType::iter().map(|e| self.get_count(e)).sum()
    }
}

impl Default for ErrorStats {
    fn default() -> Self {
        Self::new()
    }
}
