//! Conflict resolution: turns matching network rules into one verdict.

use std::collections::HashSet;
use std::sync::Arc;

use crate::rules::NetworkRule;
use crate::types::{CosmeticOption, RuleOption};

/// Resolved verdict for a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchingResult {
    /// Highest-priority rule matching the request itself.
    pub basic_rule: Option<Arc<NetworkRule>>,
    /// Document-level allowlist rule (`$document`, `$urlblock`,
    /// `$genericblock`) matching the source page or the request.
    pub document_rule: Option<Arc<NetworkRule>>,
    /// Allowlist rules that only change cosmetic filtering.
    pub cosmetic_rules: Vec<Arc<NetworkRule>>,
    pub stealth_rule: Option<Arc<NetworkRule>>,
}

impl MatchingResult {
    /// Resolve `rules` matching the request and `source_rules` matching the
    /// source page as a document request.
    pub fn new(rules: Vec<Arc<NetworkRule>>, source_rules: Vec<Arc<NetworkRule>>) -> Self {
        let rules = remove_badfiltered_rules(rules);
        let source_rules = remove_badfiltered_rules(source_rules);

        let mut result = Self::default();

        for rule in &source_rules {
            if rule.is_document_allowlist() {
                keep_higher(&mut result.document_rule, rule);
            }
        }

        let mut candidates = Vec::with_capacity(rules.len());
        for rule in rules {
            let document = rule.is_document_allowlist();
            let cosmetic = rule.is_cosmetic_option_rule();
            if document {
                keep_higher(&mut result.document_rule, &rule);
            }
            if cosmetic {
                result.cosmetic_rules.push(rule.clone());
            }
            if document || cosmetic {
                continue;
            }
            if rule.is_allowlist() && rule.is_option_enabled(RuleOption::STEALTH) {
                keep_higher(&mut result.stealth_rule, &rule);
                continue;
            }
            candidates.push(rule);
        }

        let (urlblock, genericblock) = match &result.document_rule {
            Some(doc) => (
                doc.is_option_enabled(RuleOption::URLBLOCK),
                doc.is_option_enabled(RuleOption::GENERICBLOCK),
            ),
            None => (false, false),
        };

        for rule in &candidates {
            if urlblock && !rule.is_important() {
                continue;
            }
            if genericblock && rule.is_generic() && !rule.is_allowlist() && !rule.is_important() {
                continue;
            }
            keep_higher(&mut result.basic_rule, rule);
        }

        result
    }

    /// The effective decision: the basic rule with the document-level
    /// exception applied. `None` means no rule applies.
    ///
    /// Only a `$urlblock` document rule stands in for the verdict;
    /// `$genericblock` has already filtered the candidates.
    pub fn basic_result(&self) -> Option<&Arc<NetworkRule>> {
        if let Some(basic) = &self.basic_rule {
            if basic.is_important() {
                return Some(basic);
            }
        }

        if let Some(doc) = &self.document_rule {
            if doc.is_option_enabled(RuleOption::URLBLOCK) {
                return Some(doc);
            }
        }

        self.basic_rule.as_ref()
    }

    /// Which kinds of cosmetic rules may still be applied to the page.
    pub fn cosmetic_option(&self) -> CosmeticOption {
        let mut option = CosmeticOption::ALL;

        for rule in self.cosmetic_rules.iter().chain(self.document_rule.iter()) {
            if rule.is_option_enabled(RuleOption::GENERICHIDE) {
                option.remove(CosmeticOption::GENERIC_CSS);
            }
            if rule.is_option_enabled(RuleOption::ELEMHIDE) {
                option.remove(CosmeticOption::GENERIC_CSS | CosmeticOption::CSS);
            }
            if rule.is_option_enabled(RuleOption::JSINJECT) {
                option.remove(CosmeticOption::JS);
            }
        }

        option
    }
}

/// Pick the rule that decides a DNS query: `$badfilter`, `$dnsrewrite` and
/// `$stealth` rules are left out, then the highest-priority rule wins.
pub fn dns_basic_rule(rules: &[Arc<NetworkRule>]) -> Option<Arc<NetworkRule>> {
    let rules = remove_dns_rewrite_rules(remove_badfiltered_rules(rules.to_vec()));

    let mut basic = None;
    for rule in &rules {
        if rule.is_option_enabled(RuleOption::STEALTH) {
            continue;
        }
        keep_higher(&mut basic, rule);
    }
    basic
}

/// Drop rules carrying a DNS rewrite.
pub fn remove_dns_rewrite_rules(mut rules: Vec<Arc<NetworkRule>>) -> Vec<Arc<NetworkRule>> {
    rules.retain(|r| r.dns_rewrite().is_none());
    rules
}

/// Drop `$badfilter` rules and every rule they cancel.
pub fn remove_badfiltered_rules(mut rules: Vec<Arc<NetworkRule>>) -> Vec<Arc<NetworkRule>> {
    let targets: HashSet<String> = rules
        .iter()
        .filter_map(|r| r.badfilter_target())
        .map(str::to_string)
        .collect();

    if targets.is_empty() {
        return rules;
    }

    rules.retain(|r| !r.is_badfilter() && !targets.contains(r.text()));
    rules
}

/// Replace `slot` with `rule` if it is empty or `rule` has strictly higher
/// priority.
fn keep_higher(slot: &mut Option<Arc<NetworkRule>>, rule: &Arc<NetworkRule>) {
    let replace = match slot {
        Some(current) => rule.is_higher_priority(current),
        None => true,
    };
    if replace {
        *slot = Some(Arc::clone(rule));
    }
}
