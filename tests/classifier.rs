//! Verdict-level tests for the per-domain classifier.
//!
//! These cover the probing scenarios end to end at the classification layer:
//! the DNS and TLS stages are exercised by their own tests, and the verdict
//! is a pure function of their outputs.

use ech_status::{classify, is_post_quantum_hybrid, DomainResult};
use rustls::NamedGroup;

#[test]
fn test_ech_and_kyber_handshake() {
    // Valid HTTPS record with a usable ech= value, server completes an
    // ECH handshake on a hybrid group.
    let result = classify("cloudflare.com", true, true, Some(NamedGroup::X25519MLKEM768));
    assert_eq!(
        result,
        DomainResult {
            domain: "cloudflare.com".to_string(),
            has_ech: true,
            has_kyber: true,
            accessible: true,
        }
    );
}

#[test]
fn test_no_https_record_still_classifies() {
    // No HTTPS record at all: ECH is absent, the handshake result stands on
    // its own.
    let result = classify("example.com", false, true, Some(NamedGroup::X25519));
    assert!(!result.has_ech);
    assert!(!result.has_kyber);
    assert!(result.accessible);
}

#[test]
fn test_unresolvable_domain_verdict_is_all_false() {
    // A failed A-record lookup short-circuits into the unreachable verdict.
    let result = DomainResult::unreachable("does-not-resolve.invalid");
    assert!(!result.has_ech);
    assert!(!result.has_kyber);
    assert!(!result.accessible);
}

#[test]
fn test_broken_ech_config_probes_without_ech() {
    // ech= present but undecodable: the probe ran with ECH disabled, so the
    // verdict reports no ECH while accessibility is unaffected.
    let result = classify("example.com", false, true, Some(NamedGroup::X25519));
    assert!(!result.has_ech);
    assert!(result.accessible);
}

#[test]
fn test_classical_negotiation_is_not_kyber() {
    for group in [
        NamedGroup::X25519,
        NamedGroup::secp256r1,
        NamedGroup::secp384r1,
    ] {
        let result = classify("example.com", true, true, Some(group));
        assert!(result.has_ech);
        assert!(!result.has_kyber);
        assert!(result.accessible);
    }
}

#[test]
fn test_kyber_implies_accessible_exhaustively() {
    let groups = [
        None,
        Some(NamedGroup::X25519),
        Some(NamedGroup::X25519MLKEM768),
        Some(NamedGroup::Unknown(0x6399)),
        Some(NamedGroup::Unknown(0xfe30)),
        Some(NamedGroup::Unknown(0xfe31)),
    ];
    for accessible in [false, true] {
        for ech in [false, true] {
            for group in groups {
                let result = classify("example.com", ech, accessible, group);
                // The invariant, one direction only.
                assert!(!result.has_kyber || result.accessible);
                // Accessibility alone never produces a Kyber verdict.
                if group.is_none() || !group.is_some_and(is_post_quantum_hybrid) {
                    assert!(!result.has_kyber);
                }
            }
        }
    }
}
