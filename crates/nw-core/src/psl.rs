//! Public suffix utilities for eTLD+1 extraction
//!
//! Registrable domains come from the Public Suffix List compiled into the
//! `psl` crate, private section included.
//!
//! # Examples
//!
//! ```
//! use nw_core::psl::effective_tld_plus_one;
//!
//! assert_eq!(effective_tld_plus_one("sub.example.com"), "example.com");
//! assert_eq!(effective_tld_plus_one("sub.example.co.uk"), "example.co.uk");
//! assert_eq!(effective_tld_plus_one("example.org."), "");
//! ```

use std::net::IpAddr;

/// Maximum length of a hostname in presentation format.
const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum length of a single label.
const MAX_LABEL_LEN: usize = 63;

// =============================================================================
// eTLD+1 Extraction
// =============================================================================

/// Get the eTLD+1 (registrable domain) for a lower-cased hostname.
///
/// Invalid hostnames, single-label names and bare public suffixes yield an
/// empty string. IP literals are returned as is.
pub fn effective_tld_plus_one(host: &str) -> &str {
    if host.is_empty() || host.starts_with('.') || host.ends_with('.') || host.contains("..") {
        return "";
    }

    if is_ip_literal(host) {
        return host;
    }

    ::psl::domain_str(host).unwrap_or("")
}

fn is_ip_literal(host: &str) -> bool {
    let inner = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    inner.parse::<IpAddr>().is_ok()
}

// =============================================================================
// Hostname Validation
// =============================================================================

/// Check that `host` is a syntactically valid DNS hostname.
pub fn is_valid_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > MAX_HOSTNAME_LEN {
        return false;
    }

    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    })
}

// =============================================================================
// Suffix Walking
// =============================================================================

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator over a hostname and all of its parent domains.
pub struct Subdomains<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for Subdomains<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = get_parent_domain(result);
        Some(result)
    }
}

/// Walk `host` from most specific to least specific, down to the TLD:
/// `a.b.example.org`, `b.example.org`, `example.org`, `org`.
pub fn subdomains(host: &str) -> Subdomains<'_> {
    Subdomains {
        current: if host.is_empty() { None } else { Some(host) },
    }
}

/// Check if `host` equals `domain` or is one of its subdomains.
#[inline]
pub fn is_domain_or_subdomain(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}
