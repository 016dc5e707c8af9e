//! Core type definitions for Netwarden
//!
//! Bit masks and small value types shared by the rule parser, the request
//! model and the matching engines.

use std::fmt;

/// Identifier of a loaded rule list, assigned by the caller.
pub type ListId = u32;

// =============================================================================
// Request Types (bit mask for type filtering)
// =============================================================================

bitflags::bitflags! {
    /// Request type bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RequestType: u32 {
        /// Main frame document
        const DOCUMENT = 1 << 0;
        /// iframe/frame
        const SUBDOCUMENT = 1 << 1;
        const SCRIPT = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const IMAGE = 1 << 5;
        const XMLHTTPREQUEST = 1 << 6;
        const MEDIA = 1 << 7;
        const FONT = 1 << 8;
        const WEBSOCKET = 1 << 9;
        const PING = 1 << 10;
        const OTHER = 1 << 11;
    }
}

impl RequestType {
    /// Parse from a request type or modifier name.
    pub fn from_modifier(s: &str) -> Option<Self> {
        match s {
            "document" | "doc" | "main_frame" => Some(Self::DOCUMENT),
            "subdocument" | "sub_frame" => Some(Self::SUBDOCUMENT),
            "script" => Some(Self::SCRIPT),
            "stylesheet" | "css" => Some(Self::STYLESHEET),
            "object" => Some(Self::OBJECT),
            "image" => Some(Self::IMAGE),
            "xmlhttprequest" | "xhr" => Some(Self::XMLHTTPREQUEST),
            "media" => Some(Self::MEDIA),
            "font" => Some(Self::FONT),
            "websocket" => Some(Self::WEBSOCKET),
            "ping" => Some(Self::PING),
            "other" => Some(Self::OTHER),
            _ => None,
        }
    }

    /// Number of request types set in the mask.
    #[inline]
    pub fn count(self) -> u32 {
        self.bits().count_ones()
    }
}

// =============================================================================
// Rule Options (bit flags for network rule modifiers)
// =============================================================================

bitflags::bitflags! {
    /// Flag-like network rule modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuleOption: u32 {
        /// $third-party (disabled form is ~third-party / $first-party)
        const THIRD_PARTY = 1 << 0;
        /// $match-case
        const MATCH_CASE = 1 << 1;
        /// $important - ignores exception filters
        const IMPORTANT = 1 << 2;
        /// $badfilter - cancels the rule with the same text
        const BADFILTER = 1 << 3;
        const ELEMHIDE = 1 << 4;
        const GENERICHIDE = 1 << 5;
        const GENERICBLOCK = 1 << 6;
        const JSINJECT = 1 << 7;
        const URLBLOCK = 1 << 8;
        const STEALTH = 1 << 9;

        /// Options implied by `@@...$document`
        const DOCUMENT_ALLOWLIST = Self::ELEMHIDE.bits()
            | Self::JSINJECT.bits()
            | Self::URLBLOCK.bits();
        /// Options that only change cosmetic filtering
        const COSMETIC = Self::ELEMHIDE.bits() | Self::GENERICHIDE.bits() | Self::JSINJECT.bits();
        /// Options only valid on allowlist rules
        const ALLOWLIST_ONLY = Self::ELEMHIDE.bits()
            | Self::GENERICHIDE.bits()
            | Self::GENERICBLOCK.bits()
            | Self::JSINJECT.bits()
            | Self::URLBLOCK.bits()
            | Self::STEALTH.bits();
        /// Options a DNS-level rule may carry
        const HOST_LEVEL = Self::IMPORTANT.bits() | Self::BADFILTER.bits();
    }
}

// =============================================================================
// Cosmetic Options
// =============================================================================

bitflags::bitflags! {
    /// Which kinds of cosmetic content may still be applied to a page.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CosmeticOption: u8 {
        /// Generic element hiding and CSS rules
        const GENERIC_CSS = 1 << 0;
        /// Site-specific element hiding and CSS rules
        const CSS = 1 << 1;
        /// Script rules
        const JS = 1 << 2;

        const ALL = Self::GENERIC_CSS.bits() | Self::CSS.bits() | Self::JS.bits();
    }
}

// =============================================================================
// DNS Resource Record Types
// =============================================================================

/// DNS resource record type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct RrType(pub u16);

impl RrType {
    pub const A: Self = Self(1);
    pub const NS: Self = Self(2);
    pub const CNAME: Self = Self(5);
    pub const SOA: Self = Self(6);
    pub const PTR: Self = Self(12);
    pub const MX: Self = Self(15);
    pub const TXT: Self = Self(16);
    pub const AAAA: Self = Self(28);
    pub const SRV: Self = Self(33);
    pub const SVCB: Self = Self(64);
    pub const HTTPS: Self = Self(65);
    pub const ANY: Self = Self(255);

    const NAMES: &'static [(&'static str, RrType)] = &[
        ("A", Self::A),
        ("NS", Self::NS),
        ("CNAME", Self::CNAME),
        ("SOA", Self::SOA),
        ("PTR", Self::PTR),
        ("MX", Self::MX),
        ("TXT", Self::TXT),
        ("AAAA", Self::AAAA),
        ("SRV", Self::SRV),
        ("SVCB", Self::SVCB),
        ("HTTPS", Self::HTTPS),
        ("ANY", Self::ANY),
    ];

    /// Look up a record type by its mnemonic, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, t)| t)
    }
}

impl fmt::Display for RrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::NAMES.iter().find(|(_, t)| t == self) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "TYPE{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_type_count() {
        assert_eq!(RequestType::DOCUMENT.count(), 1);
        assert_eq!((RequestType::DOCUMENT | RequestType::OTHER).count(), 2);
        assert_eq!(
            (RequestType::DOCUMENT | RequestType::OTHER | RequestType::IMAGE | RequestType::FONT)
                .count(),
            4
        );
        assert_eq!(RequestType::empty().count(), 0);
    }

    #[test]
    fn test_request_type_from_modifier() {
        assert_eq!(RequestType::from_modifier("xhr"), Some(RequestType::XMLHTTPREQUEST));
        assert_eq!(RequestType::from_modifier("main_frame"), Some(RequestType::DOCUMENT));
        assert_eq!(RequestType::from_modifier("bogus"), None);
    }

    #[test]
    fn test_rr_type_names() {
        assert_eq!(RrType::from_name("aaaa"), Some(RrType::AAAA));
        assert_eq!(RrType::from_name("nope"), None);
        assert_eq!(RrType::CNAME.to_string(), "CNAME");
        assert_eq!(RrType(999).to_string(), "TYPE999");
    }

    #[test]
    fn test_document_allowlist_is_cosmetic() {
        assert!(RuleOption::DOCUMENT_ALLOWLIST.intersects(RuleOption::COSMETIC));
        assert!(!RuleOption::HOST_LEVEL.intersects(RuleOption::ALLOWLIST_ONLY));
    }
}
