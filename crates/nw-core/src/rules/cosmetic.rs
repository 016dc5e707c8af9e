//! Cosmetic rules
//!
//! Only the envelope is parsed (domains, marker, content). Applying
//! cosmetic content to a page is left to callers.

use std::fmt;

use crate::error::RuleSyntaxError;
use crate::psl::is_domain_or_subdomain;
use crate::types::ListId;

/// Cosmetic rule markers, longest first so that prefixes do not shadow them.
const MARKERS: &[(&str, CosmeticKind, bool)] = &[
    ("#@$?#", CosmeticKind::ExtendedCss, true),
    ("#$?#", CosmeticKind::ExtendedCss, false),
    ("#@?#", CosmeticKind::ExtendedElementHiding, true),
    ("#@$#", CosmeticKind::Css, true),
    ("#@%#", CosmeticKind::Script, true),
    ("#?#", CosmeticKind::ExtendedElementHiding, false),
    ("#$#", CosmeticKind::Css, false),
    ("#%#", CosmeticKind::Script, false),
    ("#@#", CosmeticKind::ElementHiding, true),
    ("##", CosmeticKind::ElementHiding, false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CosmeticKind {
    /// `##selector`
    ElementHiding,
    /// `#?#selector`
    ExtendedElementHiding,
    /// `#$#selector { style }`
    Css,
    /// `#$?#selector { style }`
    ExtendedCss,
    /// `#%#script`
    Script,
}

/// A parsed cosmetic rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosmeticRule {
    rule_text: String,
    list_id: ListId,
    kind: CosmeticKind,
    allowlist: bool,
    content: String,
    permitted_domains: Vec<String>,
    restricted_domains: Vec<String>,
}

/// Find the cosmetic marker in a rule line: (position, marker, kind, allowlist).
fn find_marker(text: &str) -> Option<(usize, &'static str, CosmeticKind, bool)> {
    // The first `#` that starts a marker wins.
    text.match_indices('#').find_map(|(pos, _)| {
        let rest = &text[pos..];
        MARKERS
            .iter()
            .find(|(m, _, _)| rest.starts_with(m))
            .map(|(marker, kind, allowlist)| (pos, *marker, *kind, *allowlist))
    })
}

/// Check whether a line uses cosmetic rule syntax.
pub fn is_cosmetic(text: &str) -> bool {
    find_marker(text).is_some()
}

impl CosmeticRule {
    pub fn parse(text: &str, list_id: ListId) -> Result<Self, RuleSyntaxError> {
        let invalid = || RuleSyntaxError::InvalidCosmeticRule(text.to_string());

        let (pos, marker, kind, allowlist) = find_marker(text).ok_or_else(invalid)?;
        let content = text[pos + marker.len()..].trim();
        if content.is_empty() {
            return Err(invalid());
        }

        let mut permitted_domains = Vec::new();
        let mut restricted_domains = Vec::new();
        let domains = &text[..pos];
        if !domains.is_empty() {
            for domain in domains.split(',').map(str::trim) {
                let (restricted, domain) = match domain.strip_prefix('~') {
                    Some(d) => (true, d),
                    None => (false, domain),
                };
                if domain.is_empty()
                    || domain.contains(char::is_whitespace)
                    || domain.contains('#')
                {
                    return Err(invalid());
                }
                let domain = domain.to_ascii_lowercase();
                if restricted {
                    restricted_domains.push(domain);
                } else {
                    permitted_domains.push(domain);
                }
            }
        }

        Ok(Self {
            rule_text: text.to_string(),
            list_id,
            kind,
            allowlist,
            content: content.to_string(),
            permitted_domains,
            restricted_domains,
        })
    }

    pub fn text(&self) -> &str {
        &self.rule_text
    }

    pub fn list_id(&self) -> ListId {
        self.list_id
    }

    pub fn kind(&self) -> CosmeticKind {
        self.kind
    }

    pub fn is_allowlist(&self) -> bool {
        self.allowlist
    }

    /// Selector, style or script body.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Applies to every site.
    pub fn is_generic(&self) -> bool {
        self.permitted_domains.is_empty()
    }

    /// Check the domain restrictions against a page hostname.
    pub fn matches_hostname(&self, hostname: &str) -> bool {
        if self
            .restricted_domains
            .iter()
            .any(|d| is_domain_or_subdomain(hostname, d))
        {
            return false;
        }
        self.permitted_domains.is_empty()
            || self
                .permitted_domains
                .iter()
                .any(|d| is_domain_or_subdomain(hostname, d))
    }
}

impl fmt::Display for CosmeticRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rule_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_cosmetic() {
        assert!(is_cosmetic("##banner"));
        assert!(is_cosmetic("example.org#@#.ad"));
        assert!(is_cosmetic("example.org#%#window.x=1"));
        assert!(!is_cosmetic("||example.org^"));
        assert!(!is_cosmetic("# hosts comment"));
    }

    #[test]
    fn test_parse_generic() {
        let rule = CosmeticRule::parse("##banner", 2).unwrap();
        assert_eq!(rule.kind(), CosmeticKind::ElementHiding);
        assert_eq!(rule.content(), "banner");
        assert!(rule.is_generic());
        assert!(!rule.is_allowlist());
        assert_eq!(rule.list_id(), 2);
    }

    #[test]
    fn test_parse_domains() {
        let rule =
            CosmeticRule::parse("Example.org,~sub.example.org#@$?#.ad { display: none }", 1)
                .unwrap();
        assert_eq!(rule.kind(), CosmeticKind::ExtendedCss);
        assert!(rule.is_allowlist());
        assert!(!rule.is_generic());
        assert!(rule.matches_hostname("example.org"));
        assert!(rule.matches_hostname("www.example.org"));
        assert!(!rule.matches_hostname("sub.example.org"));
        assert!(!rule.matches_hostname("other.org"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(CosmeticRule::parse("example.org##", 1).is_err());
        assert!(CosmeticRule::parse("||example.org^", 1).is_err());
        assert!(CosmeticRule::parse("a b##x", 1).is_err());
    }
}
