//! DNS engine: host rules plus host-level network rules.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use nw_core::{dns_basic_rule, HostRule, NetworkRule, Request, RrType, Rule};
use nw_filterlist::{FilterListError, RuleIndex, RuleStorage};

use crate::network_engine::NetworkEngine;

/// A DNS query to filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsRequest {
    pub client_ip: Option<IpAddr>,
    pub client_name: String,
    /// Queried hostname. Empty matches nothing.
    pub hostname: String,
    /// Client tags for `$ctag`, sorted.
    pub sorted_client_tags: Vec<String>,
    pub dns_type: RrType,
    /// The request filters a response rather than a query.
    pub answer: bool,
}

impl DnsRequest {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            ..Self::default()
        }
    }

    /// Clear all fields, keeping allocations.
    pub fn reset(&mut self) {
        self.client_ip = None;
        self.client_name.clear();
        self.hostname.clear();
        self.sorted_client_tags.clear();
        self.dns_type = RrType::default();
        self.answer = false;
    }
}

/// Outcome of a DNS match. Reusable across calls via [`DnsResult::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsResult {
    /// Network rule deciding the query, if any.
    pub network_rule: Option<Arc<NetworkRule>>,
    pub host_rules_v4: Vec<Arc<HostRule>>,
    pub host_rules_v6: Vec<Arc<HostRule>>,
    /// Every matching network rule, including `$dnsrewrite` rules that never
    /// become the deciding rule.
    pub network_rules: Vec<Arc<NetworkRule>>,
}

impl DnsResult {
    pub fn reset(&mut self) {
        self.network_rule = None;
        self.host_rules_v4.clear();
        self.host_rules_v6.clear();
        self.network_rules.clear();
    }
}

/// Matches hostnames against hosts-file rules and host-level network rules.
pub struct DnsEngine {
    storage: Arc<RuleStorage>,
    network_engine: NetworkEngine,
    /// Lower-cased hostname to host rules binding it, in scan order.
    host_index: HashMap<String, Vec<RuleIndex>>,
    host_rules_count: usize,
}

impl DnsEngine {
    /// Build the host index and the host-level network engine.
    ///
    /// Fails if any list cannot be read to the end.
    pub fn new(storage: Arc<RuleStorage>) -> Result<Self, FilterListError> {
        let mut network_engine = NetworkEngine::new_skip_storage_scan(Arc::clone(&storage));
        let mut host_index: HashMap<String, Vec<RuleIndex>> = HashMap::new();
        let mut host_rules_count = 0;

        let mut scanner = storage.scan()?;
        for (rule, idx) in scanner.by_ref() {
            match rule {
                Rule::Host(host) => {
                    for hostname in host.hostnames() {
                        host_index.entry(hostname.clone()).or_default().push(idx);
                    }
                    host_rules_count += 1;
                }
                Rule::Network(rule) if rule.is_host_level_network_rule() => {
                    network_engine.add_rule(&rule, idx);
                }
                _ => {}
            }
        }
        if let Some(e) = scanner.take_error() {
            return Err(e);
        }
        drop(scanner);

        log::debug!(
            "DNS engine built: {} host rules, {} hostnames, {} network rules",
            host_rules_count,
            host_index.len(),
            network_engine.rules_count()
        );

        Ok(Self {
            storage,
            network_engine,
            host_index,
            host_rules_count,
        })
    }

    /// Match a bare hostname.
    pub fn match_hostname(&self, hostname: &str) -> (DnsResult, bool) {
        self.match_request(&DnsRequest::new(hostname))
    }

    pub fn match_request(&self, dns_req: &DnsRequest) -> (DnsResult, bool) {
        let mut res = DnsResult::default();
        let matched = self.match_request_into(dns_req, &mut res);
        (res, matched)
    }

    /// Match into a caller-owned result, appending to its lists.
    ///
    /// A deciding network rule short-circuits the host rule lookup. Returns
    /// `true` if a network rule decides the query or a host rule binds the
    /// hostname. Matching `$dnsrewrite` rules only show up in
    /// [`DnsResult::network_rules`].
    pub fn match_request_into(&self, dns_req: &DnsRequest, res: &mut DnsResult) -> bool {
        if dns_req.hostname.is_empty() {
            return false;
        }

        let mut req = Request::default();
        req.fill_for_hostname(&dns_req.hostname);
        req.client_ip = dns_req.client_ip;
        req.client_name.push_str(&dns_req.client_name);
        req.sorted_client_tags.extend_from_slice(&dns_req.sorted_client_tags);
        req.dns_type = dns_req.dns_type;

        self.network_engine.append_all_matching(&mut res.network_rules, &req);
        if let Some(rule) = dns_basic_rule(&res.network_rules) {
            res.network_rule = Some(rule);
            return true;
        }

        let Some(indexes) = self.host_index.get(req.hostname.as_str()) else {
            return false;
        };

        let mut found = false;
        for &idx in indexes {
            let Some(rule) = self.storage.retrieve_host_rule(idx) else {
                continue;
            };
            match rule.ip() {
                IpAddr::V4(_) => res.host_rules_v4.push(rule),
                IpAddr::V6(_) => res.host_rules_v6.push(rule),
            }
            found = true;
        }
        found
    }

    /// Host rules plus network rules indexed.
    pub fn rules_count(&self) -> usize {
        self.host_rules_count + self.network_engine.rules_count()
    }

    pub fn network_engine(&self) -> &NetworkEngine {
        &self.network_engine
    }
}
