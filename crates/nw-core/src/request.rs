//! Request values matched against network rules.

use std::net::IpAddr;

use crate::psl::effective_tld_plus_one;
use crate::types::{RequestType, RrType};
use crate::url::extract_host;

/// A request being filtered: a URL fetch or a bare-hostname DNS query.
///
/// Requests are reusable: [`Request::reset`] and
/// [`Request::fill_for_hostname`] keep the allocated buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Client address for `$client` modifiers.
    pub client_ip: Option<IpAddr>,
    /// Client name for `$client` modifiers. Empty means unknown.
    pub client_name: String,
    /// Full request URL.
    pub url: String,
    /// `url` in lower case; used for pattern and shortcut matching.
    pub url_lower_case: String,
    /// Request hostname, lower-cased.
    pub hostname: String,
    /// Registrable domain (eTLD+1) of `hostname`, empty if invalid.
    pub domain: String,
    /// URL of the page that initiated the request.
    pub source_url: String,
    pub source_hostname: String,
    pub source_domain: String,
    /// Client tags for `$ctag` modifiers, sorted.
    pub sorted_client_tags: Vec<String>,
    pub request_type: RequestType,
    /// DNS record type for `$dnstype` modifiers.
    pub dns_type: RrType,
    /// Source domain is known and differs from the request domain.
    pub third_party: bool,
    /// The request was built from a bare hostname.
    pub is_hostname_request: bool,
}

impl Request {
    /// Create a request for `url` initiated by `source_url` (may be empty).
    pub fn new(url: &str, source_url: &str, request_type: RequestType) -> Self {
        let mut req = Self {
            request_type,
            ..Self::default()
        };

        set_url(&mut req.url, &mut req.hostname, &mut req.domain, url);
        req.url_lower_case.push_str(&url.to_ascii_lowercase());

        if !source_url.is_empty() {
            set_url(
                &mut req.source_url,
                &mut req.source_hostname,
                &mut req.source_domain,
                source_url,
            );
        }

        req.third_party = !req.source_domain.is_empty() && req.source_domain != req.domain;
        req
    }

    /// Refill this request for a DNS lookup of `hostname`, reusing buffers.
    ///
    /// Client metadata and the DNS type are left for the caller to set.
    pub fn fill_for_hostname(&mut self, hostname: &str) {
        let hostname = hostname.trim_end_matches('.');

        self.url.clear();
        self.url.push_str("http://");
        self.url.push_str(hostname);
        self.url_lower_case.clear();
        self.url_lower_case.push_str(&self.url);
        self.url_lower_case.make_ascii_lowercase();

        self.hostname.clear();
        self.hostname.push_str(&self.url_lower_case["http://".len()..]);
        self.domain.clear();
        self.domain.push_str(effective_tld_plus_one(&self.hostname));

        self.source_url.clear();
        self.source_hostname.clear();
        self.source_domain.clear();

        self.request_type = RequestType::DOCUMENT;
        self.third_party = false;
        self.is_hostname_request = true;
    }

    /// Clear all fields, keeping allocations.
    pub fn reset(&mut self) {
        self.client_ip = None;
        self.client_name.clear();
        self.url.clear();
        self.url_lower_case.clear();
        self.hostname.clear();
        self.domain.clear();
        self.source_url.clear();
        self.source_hostname.clear();
        self.source_domain.clear();
        self.sorted_client_tags.clear();
        self.request_type = RequestType::empty();
        self.dns_type = RrType::default();
        self.third_party = false;
        self.is_hostname_request = false;
    }
}

fn set_url(url_buf: &mut String, host_buf: &mut String, domain_buf: &mut String, url: &str) {
    url_buf.clear();
    url_buf.push_str(url);

    host_buf.clear();
    if let Some(host) = extract_host(url) {
        host_buf.push_str(host);
        host_buf.make_ascii_lowercase();
    }

    domain_buf.clear();
    domain_buf.push_str(effective_tld_plus_one(host_buf.as_str()));
}
