use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use rustls::client::{EchConfig, EchMode};
use rustls::crypto::aws_lc_rs::hpke::ALL_SUPPORTED_SUITES;
use rustls::pki_types::EchConfigListBytes;
use thiserror::Error;

/// The record text carried no `ech=` parameter.
///
/// This is the only way extraction can fail, and it is the normal case for
/// domains without ECH: callers log it at debug level and probe on with ECH
/// disabled.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("no ech parameter found in HTTPS record")]
pub struct EchNotFound;

/// Failures in the ECH decoding stage.
///
/// Both variants are protocol anomalies and are logged as errors, but
/// neither fails the overall probe: the handshake proceeds with ECH
/// disabled.
#[derive(Error, Debug)]
pub enum EchError {
    /// The `ech=` value was not valid standard-alphabet base64.
    #[error("invalid base64 in ech parameter: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes were not a well-formed ECH config list.
    #[error("malformed ECH config list: {0}")]
    Unmarshal(#[from] rustls::Error),
}

/// Matches the ech SvcParam in record presentation text. Accepts both the
/// quoted form (`ech="<base64>"`, as miekg/dns and some zone files print it)
/// and the bare form (`ech=<base64>`, as hickory-dns prints it).
fn ech_param_regex() -> &'static Regex {
    static ECH_PARAM: OnceLock<Regex> = OnceLock::new();
    ECH_PARAM.get_or_init(|| {
        Regex::new(r#"ech=(?:"([^"]+)"|([A-Za-z0-9+/=]+))"#).expect("ech param regex is valid")
    })
}

/// Extracts the base64-encoded ECH config list from the textual form of an
/// HTTPS resource record.
///
/// The value is returned verbatim; no decoding happens here. Extraction is
/// pure, so re-running it on the same text always yields the same result.
///
/// # Errors
///
/// Returns [`EchNotFound`] when the text has no `ech=` parameter. This is
/// the expected outcome for most domains.
pub fn extract_ech(record_text: &str) -> Result<&str, EchNotFound> {
    let captures = ech_param_regex().captures(record_text).ok_or(EchNotFound)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str())
        .ok_or(EchNotFound)
}

/// Decodes an extracted base64 value into an ECH mode usable by a TLS client.
///
/// Two stages, each with its own failure: standard base64 decode, then a
/// structural unmarshal of the config list against the supported HPKE suites.
///
/// # Errors
///
/// Returns [`EchError::Base64`] or [`EchError::Unmarshal`]; either aborts ECH
/// usage for this domain while the rest of the probe continues.
pub fn decode_ech_config_list(value: &str) -> Result<EchMode, EchError> {
    let bytes = STANDARD.decode(value)?;
    let config = EchConfig::new(EchConfigListBytes::from(bytes), ALL_SUPPORTED_SUITES)?;
    Ok(EchMode::from(config))
}
