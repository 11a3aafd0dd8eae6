use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;

/// Normalizes a hostname to trailing-dot form for DNS queries.
///
/// Combined with `ndots = 0` on the resolver, this keeps search domains from
/// ever being appended to a probed name.
fn to_fqdn(domain: &str) -> String {
    format!("{}.", domain.trim_end_matches('.'))
}

/// True when a lookup "failure" is really a successful, empty answer.
///
/// hickory surfaces a NOERROR response with no records of the queried type as
/// `NoRecordsFound`, the same shape it uses for NXDOMAIN. Only the response
/// code tells them apart: NOERROR means the name exists but has no records of
/// this type, anything else is a genuine resolution failure.
fn is_empty_success_answer(err: &ResolveError) -> bool {
    matches!(
        err.kind(),
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NoError,
            ..
        }
    )
}

/// Checks that a domain resolves at all.
///
/// Issues a single recursive A-type query. This is the fast-fail gate that
/// separates "does not resolve" from "resolves but HTTPS probing failed":
/// the caller treats any error here as a hard, per-domain failure and skips
/// the rest of the pipeline.
///
/// A NOERROR answer with no A records still counts as existing, so
/// AAAA-only hosts pass the gate.
///
/// # Errors
///
/// Returns the underlying `ResolveError` on transport failure or NXDOMAIN.
pub async fn check_domain_exists(
    domain: &str,
    resolver: &TokioAsyncResolver,
) -> Result<(), ResolveError> {
    match resolver
        .lookup(to_fqdn(domain).as_str(), RecordType::A)
        .await
    {
        Ok(_) => Ok(()),
        Err(e) if is_empty_success_answer(&e) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Queries HTTPS resource records for a domain.
///
/// Returns the presentation-format text of each HTTPS-type record in the
/// answer, in answer order. The ECH extractor works on this text, the same
/// way the record would appear in a zone file. Most domains publish no HTTPS
/// record at all; that is an empty `Ok`, not an error.
///
/// # Errors
///
/// Returns the underlying `ResolveError` on NXDOMAIN or transport failure;
/// the caller degrades this to "no ECH available" rather than failing the
/// probe.
pub async fn lookup_https_records(
    domain: &str,
    resolver: &TokioAsyncResolver,
) -> Result<Vec<String>, ResolveError> {
    match resolver
        .lookup(to_fqdn(domain).as_str(), RecordType::HTTPS)
        .await
    {
        Ok(lookup) => Ok(lookup
            .record_iter()
            .filter(|record| record.record_type() == RecordType::HTTPS)
            .map(|record| record.to_string())
            .collect()),
        Err(e) if is_empty_success_answer(&e) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
