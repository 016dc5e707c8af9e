//! Domains table: rules keyed by their `$domain` permitted domains.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use nw_core::psl::subdomains;
use nw_core::{NetworkRule, Request};
use nw_filterlist::{RuleIndex, RuleStorage};

use super::Table;

pub struct DomainsTable {
    storage: Arc<RuleStorage>,
    domains: HashMap<String, Vec<RuleIndex>>,
    rules_count: usize,
}

impl DomainsTable {
    pub fn new(storage: Arc<RuleStorage>) -> Self {
        Self {
            storage,
            domains: HashMap::new(),
            rules_count: 0,
        }
    }
}

impl Table for DomainsTable {
    fn name(&self) -> &'static str {
        "domains"
    }

    fn add(&mut self, rule: &Arc<NetworkRule>, idx: RuleIndex) -> bool {
        let permitted = rule.permitted_domains();
        if permitted.is_empty() {
            return false;
        }

        for domain in permitted {
            self.domains.entry(domain.clone()).or_default().push(idx);
        }
        self.rules_count += 1;
        true
    }

    fn append_matching(&self, matching: &mut Vec<Arc<NetworkRule>>, req: &Request) {
        if req.source_hostname.is_empty() {
            return;
        }

        let mut seen = HashSet::new();
        for domain in subdomains(&req.source_hostname) {
            let Some(bucket) = self.domains.get(domain) else {
                continue;
            };
            for &idx in bucket {
                if !seen.insert(idx) {
                    continue;
                }
                if let Some(rule) = self.storage.retrieve_network_rule(idx) {
                    if rule.matches(req) {
                        matching.push(rule);
                    }
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.rules_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nw_core::{RequestType, Rule};
    use nw_filterlist::{RuleList, StringConfig, StringRuleList};

    fn table(text: &str) -> (DomainsTable, Vec<bool>) {
        let list: Box<dyn RuleList> = Box::new(StringRuleList::new(StringConfig {
            id: 1,
            text: text.to_string(),
            ignore_cosmetic: false,
        }));
        let storage = Arc::new(RuleStorage::new(vec![list]).unwrap());
        let mut table = DomainsTable::new(Arc::clone(&storage));
        let accepted = storage
            .scan()
            .unwrap()
            .filter_map(|(rule, idx)| match rule {
                Rule::Network(r) => Some(table.add(&r, idx)),
                _ => None,
            })
            .collect();
        (table, accepted)
    }

    fn matches(table: &DomainsTable, url: &str, source: &str) -> Vec<String> {
        let mut matching = Vec::new();
        table.append_matching(&mut matching, &Request::new(url, source, RequestType::SCRIPT));
        matching.iter().map(|r| r.text().to_string()).collect()
    }

    #[test]
    fn test_accepts_domain_rules_only() {
        let (table, accepted) = table("||ads.net^\n||ads.net^$domain=example.org|example.com\n");
        assert_eq!(accepted, vec![false, true]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_match_source_domains() {
        let (table, _) = table("||ads.net^$domain=example.org|sub.example.org");

        assert_eq!(
            matches(&table, "http://ads.net/a.js", "http://example.org/"),
            ["||ads.net^$domain=example.org|sub.example.org"]
        );
        // Reachable through two keys, returned once.
        assert_eq!(matches(&table, "http://ads.net/a.js", "http://a.sub.example.org/").len(), 1);
        assert!(matches(&table, "http://ads.net/a.js", "http://other.example/").is_empty());
        assert!(matches(&table, "http://ads.net/a.js", "").is_empty());
        assert!(matches(&table, "http://other.net/a.js", "http://example.org/").is_empty());
    }
}
