//! Sequential scan table: fallback for rules no other table indexes.

use std::sync::Arc;

use nw_core::{NetworkRule, Request};
use nw_filterlist::RuleIndex;

use super::Table;

/// Holds rules directly and checks each one against every request.
#[derive(Default)]
pub struct SeqScanTable {
    rules: Vec<Arc<NetworkRule>>,
}

impl SeqScanTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Table for SeqScanTable {
    fn name(&self) -> &'static str {
        "seqscan"
    }

    /// Refuses only a rule whose text is already present.
    fn add(&mut self, rule: &Arc<NetworkRule>, _idx: RuleIndex) -> bool {
        if self.rules.iter().any(|r| r.text() == rule.text()) {
            return false;
        }
        self.rules.push(Arc::clone(rule));
        true
    }

    fn append_matching(&self, matching: &mut Vec<Arc<NetworkRule>>, req: &Request) {
        matching.extend(self.rules.iter().filter(|r| r.matches(req)).cloned());
    }

    fn len(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nw_core::RequestType;

    fn rule(text: &str) -> Arc<NetworkRule> {
        Arc::new(NetworkRule::parse(text, 1).unwrap())
    }

    #[test]
    fn test_add_rejects_duplicate_text() {
        let mut table = SeqScanTable::new();
        assert!(table.add(&rule("/ads^"), RuleIndex::new(1, 0)));
        assert!(!table.add(&rule("/ads^"), RuleIndex::new(1, 10)));
        assert!(table.add(&rule("/ads^$script"), RuleIndex::new(1, 20)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_match() {
        let mut table = SeqScanTable::new();
        table.add(&rule("/ads^"), RuleIndex::new(1, 0));
        table.add(&rule("/ads^$script"), RuleIndex::new(1, 6));

        let mut matching = Vec::new();
        let req = Request::new("http://x.com/ads/1", "", RequestType::IMAGE);
        table.append_matching(&mut matching, &req);
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].text(), "/ads^");

        matching.clear();
        let req = Request::new("http://x.com/other", "", RequestType::IMAGE);
        table.append_matching(&mut matching, &req);
        assert!(matching.is_empty());
    }
}
