use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use rustls::client::{EchMode, EchStatus};
use rustls::crypto::{aws_lc_rs, CryptoProvider, SupportedKxGroup};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, NamedGroup, RootCertStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::config::HANDSHAKE_PROBE_TIMEOUT;

/// Observer for the key exchange a handshake actually negotiated.
///
/// The standard handshake API returns a stream, not the server's group
/// choice, so the prober invokes this listener synchronously once the
/// handshake completes. Implementations should write the value to their own
/// per-call slot; nothing here is shared between concurrent probes.
pub trait KexObserver: Send {
    /// Called with the group number the server selected.
    fn kex_negotiated(&mut self, group: NamedGroup);
}

/// A per-call capture slot for the negotiated key-exchange group.
#[derive(Debug, Default)]
pub struct KexCapture {
    group: Option<NamedGroup>,
}

impl KexCapture {
    /// Creates an empty capture slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The captured group, or `None` if the handshake never completed.
    pub fn group(&self) -> Option<NamedGroup> {
        self.group
    }
}

impl KexObserver for KexCapture {
    fn kex_negotiated(&mut self, group: NamedGroup) {
        self.group = Some(group);
    }
}

/// What a completed TLS probe observed beyond the negotiated group.
#[derive(Debug)]
pub struct HandshakeOutcome {
    /// Whether the server accepted the ECH offer (as opposed to merely
    /// receiving it).
    pub ech_accepted: bool,
}

/// Key-exchange groups offered to servers, most preferred first.
///
/// The hybrid post-quantum group leads: a server that is willing and able to
/// negotiate it will, so observing a classical group in the answer means the
/// server does not support the hybrid.
pub fn preferred_kx_groups() -> Vec<&'static dyn SupportedKxGroup> {
    vec![
        aws_lc_rs::kx_group::X25519MLKEM768,
        aws_lc_rs::kx_group::X25519,
        aws_lc_rs::kx_group::SECP256R1,
        aws_lc_rs::kx_group::SECP384R1,
    ]
}

/// Whether a negotiated group is a post-quantum hybrid.
///
/// Covers the standardized X25519MLKEM768 codepoint plus the legacy draft
/// Kyber hybrids (0x6399/0xfe31 for Kyber768, 0xfe30 for Kyber512) that some
/// servers still negotiate.
pub fn is_post_quantum_hybrid(group: NamedGroup) -> bool {
    matches!(
        group,
        NamedGroup::X25519MLKEM768
            | NamedGroup::Unknown(0x6399)
            | NamedGroup::Unknown(0xfe31)
            | NamedGroup::Unknown(0xfe30)
    )
}

/// Builds a TLS client configuration for one probe.
///
/// Every probe gets its own configuration instance; concurrent probes must
/// never share a mutable one. The crypto provider carries the probe's group
/// preference list, and ECH is enabled when a decoded config list is passed.
///
/// # Errors
///
/// Returns a `rustls::Error` if the provider rejects the configuration (no
/// compatible protocol versions, or an ECH mode the provider cannot serve).
pub fn build_client_config(ech: Option<EchMode>) -> Result<ClientConfig, rustls::Error> {
    let provider = CryptoProvider {
        kx_groups: preferred_kx_groups(),
        ..aws_lc_rs::default_provider()
    };

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let builder = ClientConfig::builder_with_provider(Arc::new(provider));
    let config = match ech {
        // ECH requires TLS 1.3; with_ech pins the versions itself.
        Some(mode) => builder
            .with_ech(mode)?
            .with_root_certificates(root_store)
            .with_no_client_auth(),
        None => builder
            .with_safe_default_protocol_versions()?
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    };
    Ok(config)
}

/// Probes a domain's HTTPS endpoint with the configured group preferences.
///
/// Connects to `<domain>:443`, performs the TLS handshake (with ECH when a
/// config was decoded), sends an HTTP/1.1 GET for `/`, and reads the start of
/// the response. The whole exchange is bounded by a single 5-second timeout.
/// On handshake completion the negotiated key-exchange group is reported to
/// `observer` before the request is written, so a later request failure still
/// leaves the capture intact.
///
/// # Errors
///
/// Returns an error on timeout or any connect/handshake/request failure; the
/// caller marks the domain inaccessible but keeps whatever ECH verdict was
/// already established.
pub async fn probe_handshake(
    domain: &str,
    ech: Option<EchMode>,
    observer: &mut dyn KexObserver,
) -> Result<HandshakeOutcome> {
    tokio::time::timeout(HANDSHAKE_PROBE_TIMEOUT, probe_exchange(domain, ech, observer))
        .await
        .map_err(|_| {
            anyhow!(
                "TLS probe timeout for {domain} ({}s)",
                HANDSHAKE_PROBE_TIMEOUT.as_secs()
            )
        })?
}

async fn probe_exchange(
    domain: &str,
    ech: Option<EchMode>,
    observer: &mut dyn KexObserver,
) -> Result<HandshakeOutcome> {
    let config = build_client_config(ech).context("invalid TLS client configuration")?;

    let server_name = ServerName::try_from(domain.to_string())
        .map_err(|e| anyhow!("invalid server name {domain}: {e}"))?;

    let sock = TcpStream::connect((domain, 443))
        .await
        .with_context(|| format!("failed to connect to {domain}:443"))?;

    let connector = TlsConnector::from(Arc::new(config));
    let mut tls_stream = connector
        .connect(server_name, sock)
        .await
        .with_context(|| format!("TLS handshake failed for {domain}"))?;

    {
        let (_, conn) = tls_stream.get_ref();
        if let Some(group) = conn.negotiated_key_exchange_group() {
            observer.kex_negotiated(group.name());
        }
        log::debug!(
            "Handshake with {domain}: version {:?}, ECH status {:?}",
            conn.protocol_version(),
            conn.ech_status()
        );
    }

    let request = format!(
        "GET / HTTP/1.1\r\n\
         Host: {domain}\r\n\
         Connection: close\r\n\
         Accept-Encoding: identity\r\n\
         \r\n",
    );
    tls_stream
        .write_all(request.as_bytes())
        .await
        .with_context(|| format!("failed to write request to {domain}"))?;

    let mut head = [0u8; 1024];
    let n = tls_stream
        .read(&mut head)
        .await
        .with_context(|| format!("failed to read response from {domain}"))?;
    if n == 0 {
        return Err(anyhow!("{domain} closed the connection before responding"));
    }

    let ech_accepted = {
        let (_, conn) = tls_stream.get_ref();
        matches!(conn.ech_status(), EchStatus::Accepted)
    };

    Ok(HandshakeOutcome { ech_accepted })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_order_leads_with_post_quantum() {
        let groups = preferred_kx_groups();
        assert!(is_post_quantum_hybrid(groups[0].name()));
        assert_eq!(groups[0].name(), NamedGroup::X25519MLKEM768);
        // The rest of the list is classical, in fixed order.
        assert_eq!(groups[1].name(), NamedGroup::X25519);
        assert_eq!(groups[2].name(), NamedGroup::secp256r1);
        assert_eq!(groups[3].name(), NamedGroup::secp384r1);
    }

    #[test]
    fn test_preference_order_is_deterministic() {
        let first: Vec<_> = preferred_kx_groups().iter().map(|g| g.name()).collect();
        let second: Vec<_> = preferred_kx_groups().iter().map(|g| g.name()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_post_quantum_hybrid_classification() {
        assert!(is_post_quantum_hybrid(NamedGroup::X25519MLKEM768));
        assert!(is_post_quantum_hybrid(NamedGroup::Unknown(0x6399)));
        assert!(is_post_quantum_hybrid(NamedGroup::Unknown(0xfe31)));
        assert!(is_post_quantum_hybrid(NamedGroup::Unknown(0xfe30)));

        assert!(!is_post_quantum_hybrid(NamedGroup::X25519));
        assert!(!is_post_quantum_hybrid(NamedGroup::secp256r1));
        assert!(!is_post_quantum_hybrid(NamedGroup::secp384r1));
        assert!(!is_post_quantum_hybrid(NamedGroup::secp521r1));
    }

    #[test]
    fn test_kex_capture_slot() {
        let mut capture = KexCapture::new();
        assert_eq!(capture.group(), None);
        capture.kex_negotiated(NamedGroup::X25519);
        assert_eq!(capture.group(), Some(NamedGroup::X25519));
    }

    #[test]
    fn test_client_config_builds_without_ech() {
        assert!(build_client_config(None).is_ok());
    }
}
