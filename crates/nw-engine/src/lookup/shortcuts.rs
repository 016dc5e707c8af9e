//! Shortcut table: rules keyed by a 5-byte window of their shortcut.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use nw_core::{NetworkRule, Request};
use nw_filterlist::{RuleIndex, RuleStorage};

use super::Table;

/// Window length.
pub const SHORTCUT_LENGTH: usize = 5;

type Shortcut = [u8; SHORTCUT_LENGTH];

/// Each rule is stored once, under the least populated bucket among the
/// windows of its shortcut. Matching probes every window of the URL.
pub struct ShortcutsTable {
    storage: Arc<RuleStorage>,
    buckets: HashMap<Shortcut, Vec<RuleIndex>>,
    rules_count: usize,
}

impl ShortcutsTable {
    pub fn new(storage: Arc<RuleStorage>) -> Self {
        Self {
            storage,
            buckets: HashMap::new(),
            rules_count: 0,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Pick the bucket for a new rule. An unused window wins outright,
    /// otherwise the window with the fewest rules.
    fn least_loaded(&self, shortcut: &[u8]) -> Option<Shortcut> {
        let mut best: Option<(Shortcut, usize)> = None;
        for window in shortcut.windows(SHORTCUT_LENGTH) {
            let Ok(key) = Shortcut::try_from(window) else {
                continue;
            };
            let count = match self.buckets.get(&key) {
                Some(bucket) => bucket.len(),
                None => return Some(key),
            };
            if best.map_or(true, |(_, c)| count < c) {
                best = Some((key, count));
            }
        }
        best.map(|(key, _)| key)
    }
}

/// Shortcuts that are just a scheme prefix would match nearly every URL.
fn is_any_url_shortcut(shortcut: &str) -> bool {
    (shortcut.len() < 6 && shortcut.starts_with("ws:"))
        || (shortcut.len() < 7 && shortcut.starts_with("wss:"))
        || (shortcut.len() < 9 && shortcut.starts_with("http"))
}

impl Table for ShortcutsTable {
    fn name(&self) -> &'static str {
        "shortcuts"
    }

    fn add(&mut self, rule: &Arc<NetworkRule>, idx: RuleIndex) -> bool {
        let shortcut = rule.shortcut();
        if shortcut.len() < SHORTCUT_LENGTH || is_any_url_shortcut(shortcut) {
            return false;
        }

        let Some(key) = self.least_loaded(shortcut.as_bytes()) else {
            return false;
        };
        self.buckets.entry(key).or_default().push(idx);
        self.rules_count += 1;
        true
    }

    fn append_matching(&self, matching: &mut Vec<Arc<NetworkRule>>, req: &Request) {
        let url = req.url_lower_case.as_bytes();
        let mut seen = HashSet::new();

        for window in url.windows(SHORTCUT_LENGTH) {
            let Ok(key) = Shortcut::try_from(window) else {
                continue;
            };
            let Some(bucket) = self.buckets.get(&key) else {
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

    fn build(text: &str) -> (Arc<RuleStorage>, Vec<(Arc<NetworkRule>, RuleIndex)>) {
        let list: Box<dyn RuleList> = Box::new(StringRuleList::new(StringConfig {
            id: 1,
            text: text.to_string(),
            ignore_cosmetic: false,
        }));
        let storage = Arc::new(RuleStorage::new(vec![list]).unwrap());
        let rules = storage
            .scan()
            .unwrap()
            .filter_map(|(rule, idx)| match rule {
                Rule::Network(r) => Some((r, idx)),
                _ => None,
            })
            .collect();
        (storage, rules)
    }

    #[test]
    fn test_accepts_long_shortcuts() {
        let (storage, rules) = build("||example.org^\n/ads^\n|https://\n|ws://\n/banner[0-9]/");
        let mut table = ShortcutsTable::new(storage);
        let accepted: Vec<bool> = rules.iter().map(|(r, idx)| table.add(r, *idx)).collect();
        assert_eq!(accepted, vec![true, false, false, false, false]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_match_revalidates() {
        let (storage, rules) = build("||example.org^\n||example.org^$script");
        let mut table = ShortcutsTable::new(storage);
        for (rule, idx) in &rules {
            assert!(table.add(rule, *idx));
        }

        let mut matching = Vec::new();
        let req = Request::new("http://example.org/", "", RequestType::IMAGE);
        table.append_matching(&mut matching, &req);
        let texts: Vec<&str> = matching.iter().map(|r| r.text()).collect();
        assert_eq!(texts, ["||example.org^"]);

        matching.clear();
        let req = Request::new("http://other.example/", "", RequestType::IMAGE);
        table.append_matching(&mut matching, &req);
        assert!(matching.is_empty());
    }

    #[test]
    fn test_least_loaded_bucket() {
        let (storage, rules) = build("||example.org^\n||example.org^$image\n||example.org^$script");
        let mut table = ShortcutsTable::new(storage);
        for (rule, idx) in &rules {
            table.add(rule, *idx);
        }
        // Each rule lands in its own window.
        assert_eq!(table.bucket_count(), 3);
        assert!(table.buckets.values().all(|b| b.len() == 1));
    }

    #[test]
    fn test_match_no_duplicates() {
        let (storage, rules) = build("||aaaaaaa^");
        let mut table = ShortcutsTable::new(storage);
        table.add(&rules[0].0, rules[0].1);

        let mut matching = Vec::new();
        let req = Request::new("http://aaaaaaa/", "", RequestType::OTHER);
        table.append_matching(&mut matching, &req);
        assert_eq!(matching.len(), 1);
    }

    #[test]
    fn test_any_url_shortcut() {
        assert!(is_any_url_shortcut("http:"));
        assert!(is_any_url_shortcut("https://"));
        assert!(is_any_url_shortcut("ws://"));
        assert!(is_any_url_shortcut("wss://"));
        assert!(!is_any_url_shortcut("https://ads"));
        assert!(!is_any_url_shortcut("example.org"));
    }
}
