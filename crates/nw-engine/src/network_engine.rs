//! Network engine: the lookup table chain over one rule storage.

use std::sync::Arc;

use nw_core::{MatchingResult, NetworkRule, Request, Rule};
use nw_filterlist::{FilterListError, RuleIndex, RuleStorage};

use crate::lookup::{DomainsTable, SeqScanTable, ShortcutsTable, Table};

/// Matches requests against network rules.
///
/// Rules are offered to the shortcuts, domains and sequential scan tables in
/// that order and kept by the first table that accepts them. The engine is
/// read-only once built.
pub struct NetworkEngine {
    storage: Arc<RuleStorage>,
    tables: Vec<Box<dyn Table>>,
    rules_count: usize,
}

impl NetworkEngine {
    /// Build an engine from every network rule in `storage`.
    ///
    /// Fails if any list cannot be read to the end.
    pub fn new(storage: Arc<RuleStorage>) -> Result<Self, FilterListError> {
        let mut engine = Self::new_skip_storage_scan(Arc::clone(&storage));

        let mut scanner = storage.scan()?;
        for (rule, idx) in scanner.by_ref() {
            if let Rule::Network(rule) = rule {
                engine.add_rule(&rule, idx);
            }
        }
        if let Some(e) = scanner.take_error() {
            return Err(e);
        }

        log::debug!("Network engine built: {}", engine.stats_line());
        Ok(engine)
    }

    /// Create an empty engine over `storage`. Rules are added by the caller.
    pub fn new_skip_storage_scan(storage: Arc<RuleStorage>) -> Self {
        let tables: Vec<Box<dyn Table>> = vec![
            Box::new(ShortcutsTable::new(Arc::clone(&storage))),
            Box::new(DomainsTable::new(Arc::clone(&storage))),
            Box::new(SeqScanTable::new()),
        ];

        Self {
            storage,
            tables,
            rules_count: 0,
        }
    }

    /// Add a rule to the first table that accepts it.
    pub fn add_rule(&mut self, rule: &Arc<NetworkRule>, idx: RuleIndex) {
        for table in &mut self.tables {
            if table.add(rule, idx) {
                self.rules_count += 1;
                return;
            }
        }
    }

    /// Resolve the single verdict for `req`.
    pub fn match_request(&self, req: &Request) -> Option<Arc<NetworkRule>> {
        let rules = self.match_all(req);
        MatchingResult::new(rules, Vec::new()).basic_result().cloned()
    }

    /// All rules matching `req`, allowlist and blocking alike.
    pub fn match_all(&self, req: &Request) -> Vec<Arc<NetworkRule>> {
        let mut matching = Vec::new();
        self.append_all_matching(&mut matching, req);
        matching
    }

    /// Append all rules matching `req` from every table.
    pub fn append_all_matching(&self, matching: &mut Vec<Arc<NetworkRule>>, req: &Request) {
        for table in &self.tables {
            table.append_matching(matching, req);
        }
    }

    /// Number of rules accepted by the tables.
    pub fn rules_count(&self) -> usize {
        self.rules_count
    }

    /// Per-table rule counts, in table order.
    pub fn table_stats(&self) -> Vec<(&'static str, usize)> {
        self.tables.iter().map(|t| (t.name(), t.len())).collect()
    }

    pub fn storage(&self) -> &Arc<RuleStorage> {
        &self.storage
    }

    fn stats_line(&self) -> String {
        let tables: Vec<String> = self
            .table_stats()
            .iter()
            .map(|(name, len)| format!("{name}={len}"))
            .collect();
        format!("{} rules ({})", self.rules_count, tables.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, BufReader, Read};

    use nw_core::RequestType;
    use nw_filterlist::{RuleList, RuleScanner, StringConfig, StringRuleList};

    /// Serves `data`, then fails every read.
    struct FailingReader {
        data: &'static [u8],
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(io::ErrorKind::Other, "device gone"));
            }
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct TruncatedList;

    impl RuleList for TruncatedList {
        fn id(&self) -> u32 {
            1
        }

        fn new_scanner(&self) -> Result<RuleScanner<'_>, FilterListError> {
            let reader = BufReader::new(FailingReader {
                data: b"||a.example^\n||b.example^",
            });
            Ok(RuleScanner::new(reader, 1, true))
        }

        fn retrieve_rule(&self, offset: usize) -> Result<Rule, FilterListError> {
            Err(FilterListError::RuleRetrieval { list_id: 1, offset })
        }
    }

    fn engine(lists: &[(u32, &str)]) -> NetworkEngine {
        let lists: Vec<Box<dyn RuleList>> = lists
            .iter()
            .map(|(id, text)| -> Box<dyn RuleList> {
                Box::new(StringRuleList::new(StringConfig {
                    id: *id,
                    text: text.to_string(),
                    ignore_cosmetic: true,
                }))
            })
            .collect();
        NetworkEngine::new(Arc::new(RuleStorage::new(lists).unwrap())).unwrap()
    }

    fn verdict(engine: &NetworkEngine, url: &str, source: &str) -> Option<String> {
        engine
            .match_request(&Request::new(url, source, RequestType::OTHER))
            .map(|r| r.text().to_string())
    }

    #[test]
    fn test_table_distribution() {
        let engine =
            engine(&[(1, "||example.org^\n/ad^$domain=example.com\n/ads^\n/ads^\n##banner")]);
        assert_eq!(engine.rules_count(), 3);
        assert_eq!(
            engine.table_stats(),
            vec![("shortcuts", 1), ("domains", 1), ("seqscan", 1)]
        );
    }

    #[test]
    fn test_match_basic() {
        let engine = engine(&[(1, "||example.org^")]);
        let expected = Some("||example.org^".to_string());
        assert_eq!(verdict(&engine, "http://example.org/", ""), expected);
        assert_eq!(verdict(&engine, "http://sub.example.org/x", ""), expected);
        assert_eq!(verdict(&engine, "http://example.com/", ""), None);
    }

    #[test]
    fn test_allowlist_and_important() {
        let allowed = engine(&[(1, "||example.org^\n@@||example.org^")]);
        assert_eq!(
            verdict(&allowed, "http://example.org/", ""),
            Some("@@||example.org^".to_string())
        );

        let important = engine(&[(1, "||example.org^$important\n@@||example.org^")]);
        assert_eq!(
            verdict(&important, "http://example.org/", ""),
            Some("||example.org^$important".to_string())
        );
    }

    #[test]
    fn test_badfilter_across_lists() {
        let engine = engine(&[(1, "||example.org^"), (2, "||example.org^$badfilter")]);
        assert_eq!(verdict(&engine, "http://example.org/", ""), None);
        let req = Request::new("http://example.org/", "", RequestType::OTHER);
        assert_eq!(engine.match_all(&req).len(), 2);
    }

    #[test]
    fn test_domain_restricted_rule() {
        let engine = engine(&[(1, "||ads.net^$domain=example.org")]);
        assert!(verdict(&engine, "http://ads.net/", "http://example.org/").is_some());
        assert!(verdict(&engine, "http://ads.net/", "http://sub.example.org/").is_some());
        assert!(verdict(&engine, "http://ads.net/", "http://other.example/").is_none());
    }

    #[test]
    fn test_short_shortcut_falls_back_to_seqscan() {
        let engine = engine(&[(1, "/ad1^")]);
        assert_eq!(engine.table_stats()[2], ("seqscan", 1));
        assert!(verdict(&engine, "http://x.com/ad1/", "").is_some());
    }

    #[test]
    fn test_build_fails_on_read_error() {
        let lists: Vec<Box<dyn RuleList>> = vec![Box::new(TruncatedList)];
        let storage = Arc::new(RuleStorage::new(lists).unwrap());
        assert!(matches!(NetworkEngine::new(storage), Err(FilterListError::Io(_))));
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NetworkEngine>();
    }
}
