//! Tests for CSV domain-list parsing.

use std::io::Write;

use ech_status::config::FALLBACK_DOMAIN_LIMIT;
use ech_status::load_domains_from_csv;
use tempfile::NamedTempFile;

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp file");
    file
}

#[test]
fn test_header_row_is_skipped() {
    let file = csv_file("domain,rank\ncloudflare.com,1\nexample.com,2\n");
    let domains = load_domains_from_csv(file.path(), 10).unwrap();
    assert_eq!(domains, vec!["cloudflare.com", "example.com"]);
}

#[test]
fn test_limit_caps_domains() {
    let file = csv_file("domain\na.com\nb.com\nc.com\nd.com\n");
    let domains = load_domains_from_csv(file.path(), 2).unwrap();
    assert_eq!(domains, vec!["a.com", "b.com"]);
}

#[test]
fn test_zero_limit_falls_back_to_default() {
    let mut contents = String::from("domain\n");
    for i in 0..(FALLBACK_DOMAIN_LIMIT + 50) {
        contents.push_str(&format!("domain{i}.com\n"));
    }
    let file = csv_file(&contents);
    let domains = load_domains_from_csv(file.path(), 0).unwrap();
    assert_eq!(domains.len(), FALLBACK_DOMAIN_LIMIT);
}

#[test]
fn test_only_first_column_is_read() {
    let file = csv_file("domain,rank,category\nexample.com,1,misc\n");
    let domains = load_domains_from_csv(file.path(), 10).unwrap();
    assert_eq!(domains, vec!["example.com"]);
}

#[test]
fn test_whitespace_is_trimmed_and_empty_rows_skipped() {
    let file = csv_file("domain\n  example.com \n\"\"\nrust-lang.org\n");
    let domains = load_domains_from_csv(file.path(), 10).unwrap();
    assert_eq!(domains, vec!["example.com", "rust-lang.org"]);
}

#[test]
fn test_missing_file_is_an_error() {
    let result = load_domains_from_csv(std::path::Path::new("/nonexistent/domains.csv"), 10);
    assert!(result.is_err());
}

#[test]
fn test_header_only_file_yields_no_domains() {
    let file = csv_file("domain,rank\n");
    let domains = load_domains_from_csv(file.path(), 10).unwrap();
    assert!(domains.is_empty());
}
