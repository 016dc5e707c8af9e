//! Rule model and line parser
//!
//! A line of rule text becomes one of three rule kinds. Comments and blank
//! lines are not rules.

mod cosmetic;
mod host;
mod network;
pub mod pattern;

use std::sync::Arc;

pub use cosmetic::{is_cosmetic, CosmeticKind, CosmeticRule};
pub use host::HostRule;
pub use network::{rcode, DnsRewrite, NetworkRule, ALLOWLIST_MARKER};

use crate::error::RuleSyntaxError;
use crate::types::ListId;

/// A parsed rule. Rules are immutable and shared between lookup tables and
/// match results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Network(Arc<NetworkRule>),
    Host(Arc<HostRule>),
    Cosmetic(Arc<CosmeticRule>),
}

impl Rule {
    /// Original rule text.
    pub fn text(&self) -> &str {
        match self {
            Rule::Network(r) => r.text(),
            Rule::Host(r) => r.text(),
            Rule::Cosmetic(r) => r.text(),
        }
    }

    pub fn list_id(&self) -> ListId {
        match self {
            Rule::Network(r) => r.list_id(),
            Rule::Host(r) => r.list_id(),
            Rule::Cosmetic(r) => r.list_id(),
        }
    }

    pub fn as_network(&self) -> Option<&Arc<NetworkRule>> {
        match self {
            Rule::Network(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&Arc<HostRule>> {
        match self {
            Rule::Host(r) => Some(r),
            _ => None,
        }
    }
}

/// Check whether a trimmed line is a comment.
pub fn is_comment(line: &str) -> bool {
    if line.starts_with('!') {
        return true;
    }
    if line.starts_with("[Adblock") && line.ends_with(']') {
        return true;
    }
    line.starts_with('#') && !is_cosmetic(line)
}

/// Parse one line of rule text.
///
/// Returns `Ok(None)` for blank lines and comments. Hosts-file syntax is tried
/// before network rule syntax, so a bare hostname is a host rule.
pub fn parse_rule(line: &str, list_id: ListId) -> Result<Option<Rule>, RuleSyntaxError> {
    let line = line.trim();
    if line.is_empty() || is_comment(line) {
        return Ok(None);
    }

    if is_cosmetic(line) {
        return CosmeticRule::parse(line, list_id).map(|r| Some(Rule::Cosmetic(Arc::new(r))));
    }

    if let Ok(rule) = HostRule::parse(line, list_id) {
        return Ok(Some(Rule::Host(Arc::new(rule))));
    }

    NetworkRule::parse(line, list_id).map(|r| Some(Rule::Network(Arc::new(r))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments() {
        assert_eq!(parse_rule("", 1), Ok(None));
        assert_eq!(parse_rule("   ", 1), Ok(None));
        assert_eq!(parse_rule("! comment", 1), Ok(None));
        assert_eq!(parse_rule("# hosts comment", 1), Ok(None));
        assert_eq!(parse_rule("#", 1), Ok(None));
        assert_eq!(parse_rule("[Adblock Plus 2.0]", 1), Ok(None));
    }

    #[test]
    fn test_parse_kinds() {
        let rule = parse_rule("  ||example.org^  ", 7).unwrap().unwrap();
        assert!(matches!(rule, Rule::Network(_)));
        assert_eq!(rule.text(), "||example.org^");
        assert_eq!(rule.list_id(), 7);

        let rule = parse_rule("##banner", 1).unwrap().unwrap();
        assert!(matches!(rule, Rule::Cosmetic(_)));

        let rule = parse_rule("0.0.0.0 ads.example", 1).unwrap().unwrap();
        assert!(rule.as_host().is_some());

        let rule = parse_rule("example.org", 1).unwrap().unwrap();
        assert!(rule.as_host().is_some());
        assert!(rule.as_network().is_none());
    }

    #[test]
    fn test_parse_error() {
        assert!(parse_rule("||example.org^$bogus", 1).is_err());
        assert!(parse_rule("example.org##", 1).is_err());
    }
}
