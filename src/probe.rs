use hickory_resolver::error::ResolveError;
use hickory_resolver::TokioAsyncResolver;
use log::{debug, error, warn};
use rustls::client::EchMode;
use rustls::NamedGroup;

use crate::ech::{self, EchError, EchNotFound};
use crate::error_handling::{ErrorStats, ErrorType, ProbeError};
use crate::dns;
use crate::tls::{self, KexCapture};

/// The terminal, immutable verdict for one domain.
///
/// Created once per probe and returned to the orchestrator by value; nothing
/// mutates it afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainResult {
    /// The domain that was probed.
    pub domain: String,
    /// A usable ECH configuration was found and offered, whether or not the
    /// handshake using it succeeded.
    pub has_ech: bool,
    /// The handshake completed and negotiated a post-quantum hybrid group.
    /// Always implies `accessible`.
    pub has_kyber: bool,
    /// The HTTPS request completed.
    pub accessible: bool,
}

impl DomainResult {
    /// Verdict for a domain that never resolved: all flags false.
    pub fn unreachable(domain: impl Into<String>) -> Self {
        DomainResult {
            domain: domain.into(),
            has_ech: false,
            has_kyber: false,
            accessible: false,
        }
    }
}

/// Runs the full probing pipeline for one domain.
///
/// Stages are strictly sequential: existence check, HTTPS-record lookup, ECH
/// extraction and decoding, TLS handshake with the group preference list,
/// classification. Every stage runs at most once; there are no retries
/// anywhere in this pipeline.
///
/// # Errors
///
/// Only total unreachability (the preliminary A-record lookup failing) is
/// returned as an error. Every other anomaly degrades into a complete
/// [`DomainResult`]: a failed HTTPS lookup or broken ECH config means probing
/// without ECH, and a failed handshake means `accessible == false`.
pub async fn probe_domain(
    domain: &str,
    resolver: &TokioAsyncResolver,
    stats: &ErrorStats,
) -> Result<DomainResult, ProbeError> {
    dns::check_domain_exists(domain, resolver)
        .await
        .map_err(|source| {
            stats.increment(ErrorType::DnsExistenceLookupError);
            ProbeError::Unresolvable {
                domain: domain.to_string(),
                source,
            }
        })?;

    let records = degrade_https_lookup(
        domain,
        dns::lookup_https_records(domain, resolver).await,
        stats,
    );

    // Only the first HTTPS record is inspected; one parse attempt settles the
    // ECH question for the domain.
    let ech_mode = records
        .first()
        .and_then(|text| attempt_ech(domain, text, stats));
    let ech_offered = ech_mode.is_some();

    let mut capture = KexCapture::new();
    match tls::probe_handshake(domain, ech_mode, &mut capture).await {
        Ok(outcome) => {
            if outcome.ech_accepted {
                debug!("ECH accepted by {domain}");
            }
            Ok(classify(domain, ech_offered, true, capture.group()))
        }
        Err(e) => {
            warn!("TLS probe failed for {domain}: {e:#}");
            stats.increment(ErrorType::TlsHandshakeError);
            Ok(classify(domain, ech_offered, false, capture.group()))
        }
    }
}

/// Folds an HTTPS-record lookup outcome into the record list, degrading
/// failures to "no records". An empty answer arrives as `Ok` from the DNS
/// layer, so only genuine lookup errors are counted and logged here.
fn degrade_https_lookup(
    domain: &str,
    outcome: Result<Vec<String>, ResolveError>,
    stats: &ErrorStats,
) -> Vec<String> {
    match outcome {
        Ok(records) => records,
        Err(e) => {
            warn!("HTTPS record lookup failed for {domain}: {e}");
            stats.increment(ErrorType::DnsHttpsLookupError);
            Vec::new()
        }
    }
}

/// Extracts and decodes the ECH config from one record's text, applying the
/// per-stage logging policy: absence is debug-level, malformed configs are
/// error-level, and neither blocks the handshake.
fn attempt_ech(domain: &str, record_text: &str, stats: &ErrorStats) -> Option<EchMode> {
    let value = match ech::extract_ech(record_text) {
        Ok(value) => value,
        Err(EchNotFound) => {
            debug!("No ech parameter in HTTPS record for {domain}");
            return None;
        }
    };
    debug!("ECH value for {domain}: {value}");

    match ech::decode_ech_config_list(value) {
        Ok(mode) => Some(mode),
        Err(e @ EchError::Base64(_)) => {
            error!("Failed to decode ECH config for {domain}: {e}");
            stats.increment(ErrorType::EchBase64DecodeError);
            None
        }
        Err(e) => {
            error!("Failed to unmarshal ECH config for {domain}: {e}");
            stats.increment(ErrorType::EchUnmarshalError);
            None
        }
    }
}

/// Combines the stage outputs into a per-domain verdict.
///
/// Pure and deterministic: `has_kyber` can only be set when the handshake
/// completed and the negotiated group was a post-quantum hybrid, so
/// `has_kyber` implies `accessible` by construction. `has_ech` reflects only
/// whether a usable config was found and offered, independent of the
/// handshake result.
pub fn classify(
    domain: &str,
    ech_offered: bool,
    accessible: bool,
    negotiated: Option<NamedGroup>,
) -> DomainResult {
    DomainResult {
        domain: domain.to_string(),
        has_ech: ech_offered,
        has_kyber: accessible && negotiated.is_some_and(tls::is_post_quantum_hybrid),
        accessible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_full_support() {
        let result = classify("example.com", true, true, Some(NamedGroup::X25519MLKEM768));
        assert!(result.has_ech);
        assert!(result.has_kyber);
        assert!(result.accessible);
    }

    #[test]
    fn test_classify_classical_group_is_not_kyber() {
        let result = classify("example.com", false, true, Some(NamedGroup::X25519));
        assert!(!result.has_ech);
        assert!(!result.has_kyber);
        assert!(result.accessible);
    }

    #[test]
    fn test_classify_failed_handshake_never_sets_kyber() {
        // Even with a captured post-quantum group, a failed request cannot
        // produce a Kyber verdict.
        let result = classify("example.com", true, false, Some(NamedGroup::X25519MLKEM768));
        assert!(result.has_ech);
        assert!(!result.has_kyber);
        assert!(!result.accessible);
    }

    #[test]
    fn test_classify_no_group_captured() {
        let result = classify("example.com", false, true, None);
        assert!(!result.has_kyber);
        assert!(result.accessible);
    }

    #[test]
    fn test_classify_kyber_implies_accessible() {
        let groups = [
            None,
            Some(NamedGroup::X25519),
            Some(NamedGroup::X25519MLKEM768),
            Some(NamedGroup::Unknown(0x6399)),
            Some(NamedGroup::Unknown(0xfe30)),
        ];
        for accessible in [false, true] {
            for ech in [false, true] {
                for group in groups {
                    let result = classify("example.com", ech, accessible, group);
                    assert!(!result.has_kyber || result.accessible);
                    assert_eq!(result.has_ech, ech);
                }
            }
        }
    }

    #[test]
    fn test_absent_https_records_do_not_count_as_errors() {
        // A domain with no HTTPS record yields an empty answer, not a lookup
        // failure; the error tally must stay at zero.
        let stats = ErrorStats::default();
        let records = degrade_https_lookup("example.com", Ok(Vec::new()), &stats);
        assert!(records.is_empty());
        assert_eq!(stats.get_count(ErrorType::DnsHttpsLookupError), 0);
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_failed_https_lookup_is_counted_and_degraded() {
        let stats = ErrorStats::default();
        let records = degrade_https_lookup(
            "example.com",
            Err(ResolveError::from("connection refused")),
            &stats,
        );
        assert!(records.is_empty());
        assert_eq!(stats.get_count(ErrorType::DnsHttpsLookupError), 1);
    }

    #[test]
    fn test_legacy_draft_groups_count_as_kyber() {
        for code in [0x6399u16, 0xfe31, 0xfe30] {
            let result = classify("example.com", true, true, Some(NamedGroup::Unknown(code)));
            assert!(result.has_kyber, "codepoint {code:#06x} should classify");
        }
    }
}
