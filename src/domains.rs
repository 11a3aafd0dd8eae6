use std::path::Path;

use anyhow::{Context, Result};
use log::warn;

use crate::config::FALLBACK_DOMAIN_LIMIT;

/// Loads domains from a CSV file, first column, header row skipped.
///
/// At most `limit` domains are returned (a zero limit falls back to
/// [`FALLBACK_DOMAIN_LIMIT`]). Malformed records and empty first columns are
/// warned about and skipped; a bad row in a popularity list should cost one
/// domain, not the run.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or its header read.
pub fn load_domains_from_csv(path: &Path, limit: usize) -> Result<Vec<String>> {
    let limit = if limit == 0 {
        FALLBACK_DOMAIN_LIMIT
    } else {
        limit
    };

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open domain list {}", path.display()))?;

    let mut domains = Vec::new();
    for record in reader.records() {
        if domains.len() >= limit {
            break;
        }
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed record in {}: {e}", path.display());
                continue;
            }
        };
        match record.get(0).map(str::trim) {
            Some(domain) if !domain.is_empty() => domains.push(domain.to_string()),
            _ => warn!("Skipping record with empty domain in {}", path.display()),
        }
    }

    Ok(domains)
}
