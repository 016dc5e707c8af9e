//! Network rules: URL patterns with modifiers
//!
//! `[@@]pattern[$modifier[,modifier...]]`

use std::fmt;
use std::net::IpAddr;

use crate::error::RuleSyntaxError;
use crate::psl::is_domain_or_subdomain;
use crate::request::Request;
use crate::rules::pattern::{find_shortcut, Pattern};
use crate::types::{ListId, RequestType, RrType, RuleOption};

/// Allowlist (exception) rule prefix.
pub const ALLOWLIST_MARKER: &str = "@@";

/// Minimum pattern length for a rule without `$domain` restrictions.
const MIN_PATTERN_LEN: usize = 3;

// =============================================================================
// DNS Rewrites
// =============================================================================

/// DNS response codes used by `$dnsrewrite`.
pub mod rcode {
    pub const NOERROR: u16 = 0;
    pub const SERVFAIL: u16 = 2;
    pub const NXDOMAIN: u16 = 3;
    pub const REFUSED: u16 = 5;

    pub fn from_name(name: &str) -> Option<u16> {
        match name.to_ascii_uppercase().as_str() {
            "NOERROR" => Some(NOERROR),
            "SERVFAIL" => Some(SERVFAIL),
            "NXDOMAIN" => Some(NXDOMAIN),
            "REFUSED" => Some(REFUSED),
            _ => None,
        }
    }
}

/// Parsed `$dnsrewrite` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRewrite {
    pub rcode: u16,
    /// Record type of the rewritten answer. Zero when only the rcode changes.
    pub rr_type: RrType,
    /// Answer value: an IP address or record data.
    pub value: String,
    /// Target hostname of a CNAME rewrite.
    pub new_cname: String,
}

impl DnsRewrite {
    /// Parse the short forms (`NXDOMAIN`, `1.2.3.4`, `host.example`) and the
    /// full `RCODE;TYPE;VALUE` form.
    pub fn parse(value: &str) -> Result<Self, RuleSyntaxError> {
        let invalid = || RuleSyntaxError::invalid_value("dnsrewrite", value);

        if value.contains(';') {
            let mut parts = value.splitn(3, ';');
            let (code, rr, val) = match (parts.next(), parts.next(), parts.next()) {
                (Some(c), Some(t), Some(v)) => (c, t, v),
                _ => return Err(invalid()),
            };
            let rcode = rcode::from_name(code).ok_or_else(invalid)?;
            let rr_type = if rr.is_empty() {
                RrType::default()
            } else {
                RrType::from_name(rr).ok_or_else(invalid)?
            };
            let (value, new_cname) = if rr_type == RrType::CNAME {
                (String::new(), val.to_string())
            } else {
                (val.to_string(), String::new())
            };
            return Ok(Self {
                rcode,
                rr_type,
                value,
                new_cname,
            });
        }

        if let Some(code) = rcode::from_name(value) {
            return Ok(Self {
                rcode: code,
                rr_type: RrType::default(),
                value: String::new(),
                new_cname: String::new(),
            });
        }

        if let Ok(ip) = value.parse::<IpAddr>() {
            return Ok(Self {
                rcode: rcode::NOERROR,
                rr_type: if ip.is_ipv4() { RrType::A } else { RrType::AAAA },
                value: value.to_string(),
                new_cname: String::new(),
            });
        }

        if crate::psl::is_valid_hostname(value) {
            return Ok(Self {
                rcode: rcode::NOERROR,
                rr_type: RrType::CNAME,
                value: String::new(),
                new_cname: value.to_ascii_lowercase(),
            });
        }

        Err(invalid())
    }
}

// =============================================================================
// Client Matching
// =============================================================================

/// One `$client` value.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClientMatcher {
    Ip(IpAddr),
    Subnet(IpAddr, u8),
    Name(String),
}

impl ClientMatcher {
    fn parse(value: &str) -> Self {
        let value = value.trim_matches(|c| c == '\'' || c == '"');
        if let Ok(ip) = value.parse::<IpAddr>() {
            return ClientMatcher::Ip(ip);
        }
        if let Some((addr, bits)) = value.split_once('/') {
            if let (Ok(ip), Ok(bits)) = (addr.parse::<IpAddr>(), bits.parse::<u8>()) {
                let max = if ip.is_ipv4() { 32 } else { 128 };
                if bits <= max {
                    return ClientMatcher::Subnet(ip, bits);
                }
            }
        }
        ClientMatcher::Name(value.to_string())
    }

    fn matches(&self, ip: Option<IpAddr>, name: &str) -> bool {
        match self {
            ClientMatcher::Ip(addr) => ip == Some(*addr),
            ClientMatcher::Subnet(net, bits) => ip.is_some_and(|ip| in_subnet(ip, *net, *bits)),
            ClientMatcher::Name(n) => !name.is_empty() && n == name,
        }
    }
}

fn in_subnet(ip: IpAddr, net: IpAddr, bits: u8) -> bool {
    match (ip, net) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            let mask = u32::MAX.checked_shl(32 - bits as u32).unwrap_or(0);
            u32::from(ip) & mask == u32::from(net) & mask
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            let mask = u128::MAX.checked_shl(128 - bits as u32).unwrap_or(0);
            u128::from(ip) & mask == u128::from(net) & mask
        }
        _ => false,
    }
}

// =============================================================================
// Network Rule
// =============================================================================

/// A parsed network rule.
#[derive(Debug, Clone)]
pub struct NetworkRule {
    rule_text: String,
    list_id: ListId,
    allowlist: bool,

    pattern: Pattern,
    shortcut: String,

    enabled_options: RuleOption,
    disabled_options: RuleOption,
    permitted_request_types: RequestType,
    restricted_request_types: RequestType,

    permitted_domains: Vec<String>,
    restricted_domains: Vec<String>,
    denyallow_domains: Vec<String>,

    permitted_clients: Vec<ClientMatcher>,
    restricted_clients: Vec<ClientMatcher>,
    permitted_client_tags: Vec<String>,
    restricted_client_tags: Vec<String>,
    permitted_dns_types: Vec<RrType>,
    restricted_dns_types: Vec<RrType>,

    dns_rewrite: Option<DnsRewrite>,
    badfilter_target: Option<String>,
    modifier_count: usize,
}

impl NetworkRule {
    /// Parse a network rule from trimmed rule text.
    pub fn parse(text: &str, list_id: ListId) -> Result<Self, RuleSyntaxError> {
        let (allowlist, body) = match text.strip_prefix(ALLOWLIST_MARKER) {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let (pattern_text, options_text) = split_options(body);

        let mut rule = Self {
            rule_text: text.to_string(),
            list_id,
            allowlist,
            pattern: Pattern::Any,
            shortcut: String::new(),
            enabled_options: RuleOption::empty(),
            disabled_options: RuleOption::empty(),
            permitted_request_types: RequestType::empty(),
            restricted_request_types: RequestType::empty(),
            permitted_domains: Vec::new(),
            restricted_domains: Vec::new(),
            denyallow_domains: Vec::new(),
            permitted_clients: Vec::new(),
            restricted_clients: Vec::new(),
            permitted_client_tags: Vec::new(),
            restricted_client_tags: Vec::new(),
            permitted_dns_types: Vec::new(),
            restricted_dns_types: Vec::new(),
            dns_rewrite: None,
            badfilter_target: None,
            modifier_count: 0,
        };

        if let Some(options) = options_text {
            for option in options.split(',') {
                let option = option.trim();
                if option.is_empty() {
                    continue;
                }
                rule.load_option(option)?;
                rule.modifier_count += 1;
            }
        }

        if rule.enabled_options.contains(RuleOption::BADFILTER) {
            let options_text = options_text.unwrap_or("");
            rule.badfilter_target = Some(badfilter_target(text, pattern_text, options_text));
        }

        let significant = pattern_text.trim_matches(|c| matches!(c, '|' | '*' | '^'));
        if significant.len() < MIN_PATTERN_LEN && rule.permitted_domains.is_empty() {
            return Err(RuleSyntaxError::TooShort(text.to_string()));
        }

        let match_case = rule.enabled_options.contains(RuleOption::MATCH_CASE);
        rule.pattern = Pattern::compile(pattern_text, match_case)?;
        rule.shortcut = find_shortcut(pattern_text);

        Ok(rule)
    }

    fn load_option(&mut self, option: &str) -> Result<(), RuleSyntaxError> {
        let (name, value) = match option.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (option, None),
        };
        let (negated, key) = match name.strip_prefix('~') {
            Some(key) => (true, key),
            None => (false, name),
        };

        match key {
            "domain" | "from" => {
                let value = required(name, value)?;
                split_negatable(
                    name,
                    value,
                    &mut self.permitted_domains,
                    &mut self.restricted_domains,
                    |d| Some(d.to_ascii_lowercase()),
                )?;
            }
            "denyallow" => {
                let value = required(name, value)?;
                for domain in value.split('|') {
                    if domain.is_empty() || domain.starts_with('~') {
                        return Err(RuleSyntaxError::invalid_value(name, value));
                    }
                    self.denyallow_domains.push(domain.to_ascii_lowercase());
                }
            }
            "client" => {
                let value = required(name, value)?;
                split_negatable(
                    name,
                    value,
                    &mut self.permitted_clients,
                    &mut self.restricted_clients,
                    |c| Some(ClientMatcher::parse(c)),
                )?;
            }
            "ctag" => {
                let value = required(name, value)?;
                split_negatable(
                    name,
                    value,
                    &mut self.permitted_client_tags,
                    &mut self.restricted_client_tags,
                    |t| Some(t.to_string()),
                )?;
            }
            "dnstype" => {
                let value = required(name, value)?;
                split_negatable(
                    name,
                    value,
                    &mut self.permitted_dns_types,
                    &mut self.restricted_dns_types,
                    RrType::from_name,
                )?;
            }
            "dnsrewrite" => {
                let value = required(name, value)?;
                self.dns_rewrite = Some(DnsRewrite::parse(value)?);
            }
            "third-party" | "3p" => {
                no_value(name, value)?;
                self.set_third_party(!negated);
            }
            "first-party" | "1p" => {
                no_value(name, value)?;
                self.set_third_party(negated);
            }
            "match-case" => self.set_flag(name, value, RuleOption::MATCH_CASE)?,
            "important" => self.set_flag(name, value, RuleOption::IMPORTANT)?,
            "badfilter" => self.set_flag(name, value, RuleOption::BADFILTER)?,
            "elemhide" | "ehide" => self.set_allowlist_flag(name, value, RuleOption::ELEMHIDE)?,
            "generichide" | "ghide" => {
                self.set_allowlist_flag(name, value, RuleOption::GENERICHIDE)?
            }
            "genericblock" => self.set_allowlist_flag(name, value, RuleOption::GENERICBLOCK)?,
            "jsinject" => self.set_allowlist_flag(name, value, RuleOption::JSINJECT)?,
            "urlblock" => self.set_allowlist_flag(name, value, RuleOption::URLBLOCK)?,
            "stealth" => self.set_allowlist_flag(name, value, RuleOption::STEALTH)?,
            "document" | "doc" => {
                no_value(name, value)?;
                self.set_request_type(RequestType::DOCUMENT, negated);
                if self.allowlist && !negated {
                    self.enabled_options |= RuleOption::DOCUMENT_ALLOWLIST;
                }
            }
            _ => match RequestType::from_modifier(key) {
                Some(request_type) => {
                    no_value(name, value)?;
                    self.set_request_type(request_type, negated);
                }
                None => return Err(RuleSyntaxError::UnknownModifier(name.to_string())),
            },
        }

        Ok(())
    }

    fn set_third_party(&mut self, enabled: bool) {
        if enabled {
            self.enabled_options |= RuleOption::THIRD_PARTY;
        } else {
            self.disabled_options |= RuleOption::THIRD_PARTY;
        }
    }

    fn set_flag(
        &mut self,
        name: &str,
        value: Option<&str>,
        flag: RuleOption,
    ) -> Result<(), RuleSyntaxError> {
        no_value(name, value)?;
        self.enabled_options |= flag;
        Ok(())
    }

    fn set_allowlist_flag(
        &mut self,
        name: &str,
        value: Option<&str>,
        flag: RuleOption,
    ) -> Result<(), RuleSyntaxError> {
        if !self.allowlist {
            return Err(RuleSyntaxError::AllowlistOnly(name.to_string()));
        }
        self.set_flag(name, value, flag)
    }

    fn set_request_type(&mut self, request_type: RequestType, negated: bool) {
        if negated {
            self.restricted_request_types |= request_type;
        } else {
            self.permitted_request_types |= request_type;
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Original rule text.
    pub fn text(&self) -> &str {
        &self.rule_text
    }

    pub fn list_id(&self) -> ListId {
        self.list_id
    }

    pub fn is_allowlist(&self) -> bool {
        self.allowlist
    }

    /// Longest lower-cased literal run of the pattern.
    pub fn shortcut(&self) -> &str {
        &self.shortcut
    }

    pub fn is_regex(&self) -> bool {
        self.pattern.is_regex()
    }

    /// Check that every flag in `option` is enabled.
    #[inline]
    pub fn is_option_enabled(&self, option: RuleOption) -> bool {
        self.enabled_options.contains(option)
    }

    #[inline]
    pub fn is_important(&self) -> bool {
        self.enabled_options.contains(RuleOption::IMPORTANT)
    }

    #[inline]
    pub fn is_badfilter(&self) -> bool {
        self.enabled_options.contains(RuleOption::BADFILTER)
    }

    /// Text of the rule this `$badfilter` rule cancels.
    pub fn badfilter_target(&self) -> Option<&str> {
        self.badfilter_target.as_deref()
    }

    pub fn permitted_domains(&self) -> &[String] {
        &self.permitted_domains
    }

    pub fn restricted_domains(&self) -> &[String] {
        &self.restricted_domains
    }

    pub fn dns_rewrite(&self) -> Option<&DnsRewrite> {
        self.dns_rewrite.as_ref()
    }

    /// No `$domain` restriction.
    #[inline]
    pub fn is_generic(&self) -> bool {
        self.permitted_domains.is_empty()
    }

    /// Allowlist rule changing how cosmetic rules apply to a page.
    pub fn is_cosmetic_option_rule(&self) -> bool {
        self.allowlist && self.enabled_options.intersects(RuleOption::COSMETIC)
    }

    /// Allowlist rule that can act as a document-level exception.
    pub fn is_document_allowlist(&self) -> bool {
        self.allowlist
            && self
                .enabled_options
                .intersects(RuleOption::URLBLOCK | RuleOption::GENERICBLOCK)
    }

    /// Whether the rule can be applied to a bare hostname: no domain or
    /// request type restrictions and no flags beyond `$important` and
    /// `$badfilter`.
    pub fn is_host_level_network_rule(&self) -> bool {
        self.permitted_domains.is_empty()
            && self.restricted_domains.is_empty()
            && self.permitted_request_types.is_empty()
            && self.restricted_request_types.is_empty()
            && self.disabled_options.is_empty()
            && RuleOption::HOST_LEVEL.contains(self.enabled_options)
    }

    /// Priority ordering: `$important` first, then allowlist, then
    /// `$domain`-specific over generic, then the number of modifiers.
    pub fn is_higher_priority(&self, other: &NetworkRule) -> bool {
        if self.is_important() != other.is_important() {
            return self.is_important();
        }
        if self.allowlist != other.allowlist {
            return self.allowlist;
        }
        if self.is_generic() != other.is_generic() {
            return !self.is_generic();
        }
        self.modifier_count > other.modifier_count
    }

    // =========================================================================
    // Matching
    // =========================================================================

    /// Check the rule against a request.
    pub fn matches(&self, req: &Request) -> bool {
        if self.enabled_options.contains(RuleOption::THIRD_PARTY) && !req.third_party {
            return false;
        }
        if self.disabled_options.contains(RuleOption::THIRD_PARTY) && req.third_party {
            return false;
        }

        if !self.matches_request_type(req.request_type) {
            return false;
        }

        let source = if req.is_hostname_request {
            &req.hostname
        } else {
            &req.source_hostname
        };
        if !self.matches_domains(source) {
            return false;
        }

        if self
            .denyallow_domains
            .iter()
            .any(|d| is_domain_or_subdomain(&req.hostname, d))
        {
            return false;
        }

        if !self.matches_client(req) || !self.matches_client_tags(&req.sorted_client_tags) {
            return false;
        }

        if !self.matches_dns_type(req.dns_type) {
            return false;
        }

        if self.enabled_options.contains(RuleOption::MATCH_CASE) {
            self.pattern.matches(&req.url)
        } else {
            self.pattern.matches(&req.url_lower_case)
        }
    }

    fn matches_request_type(&self, request_type: RequestType) -> bool {
        if !self.permitted_request_types.is_empty()
            && !self.permitted_request_types.intersects(request_type)
        {
            return false;
        }
        !self.restricted_request_types.intersects(request_type)
    }

    fn matches_domains(&self, host: &str) -> bool {
        if !self.permitted_domains.is_empty()
            && !self
                .permitted_domains
                .iter()
                .any(|d| !host.is_empty() && is_domain_or_subdomain(host, d))
        {
            return false;
        }
        !self
            .restricted_domains
            .iter()
            .any(|d| !host.is_empty() && is_domain_or_subdomain(host, d))
    }

    fn matches_client(&self, req: &Request) -> bool {
        if !self.permitted_clients.is_empty()
            && !self
                .permitted_clients
                .iter()
                .any(|c| c.matches(req.client_ip, &req.client_name))
        {
            return false;
        }
        !self
            .restricted_clients
            .iter()
            .any(|c| c.matches(req.client_ip, &req.client_name))
    }

    fn matches_client_tags(&self, sorted_tags: &[String]) -> bool {
        let has = |tag: &String| sorted_tags.binary_search(tag).is_ok();
        if !self.permitted_client_tags.is_empty() && !self.permitted_client_tags.iter().any(has) {
            return false;
        }
        !self.restricted_client_tags.iter().any(has)
    }

    fn matches_dns_type(&self, dns_type: RrType) -> bool {
        if !self.permitted_dns_types.is_empty() && !self.permitted_dns_types.contains(&dns_type) {
            return false;
        }
        !self.restricted_dns_types.contains(&dns_type)
    }
}

impl fmt::Display for NetworkRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rule_text)
    }
}

impl PartialEq for NetworkRule {
    fn eq(&self, other: &Self) -> bool {
        self.rule_text == other.rule_text && self.list_id == other.list_id
    }
}

impl Eq for NetworkRule {}

// =============================================================================
// Parsing Helpers
// =============================================================================

/// Split rule body at the last `$`. A `$` inside a `/regex/` pattern is not
/// an options separator.
fn split_options(body: &str) -> (&str, Option<&str>) {
    match body.rfind('$') {
        Some(pos) => {
            let (pattern, options) = (&body[..pos], &body[pos + 1..]);
            if pattern.starts_with('/') && options.contains('/') {
                (body, None)
            } else {
                (pattern, Some(options))
            }
        }
        None => (body, None),
    }
}

/// Build the text of the rule cancelled by a `$badfilter` rule.
fn badfilter_target(text: &str, pattern: &str, options: &str) -> String {
    let prefix = if text.starts_with(ALLOWLIST_MARKER) { ALLOWLIST_MARKER } else { "" };
    let remaining: Vec<&str> = options
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty() && *o != "badfilter")
        .collect();

    let mut target = format!("{prefix}{pattern}");
    if !remaining.is_empty() {
        target.push('$');
        target.push_str(&remaining.join(","));
    }
    target
}

fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, RuleSyntaxError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RuleSyntaxError::invalid_value(name, value.unwrap_or(""))),
    }
}

fn no_value(name: &str, value: Option<&str>) -> Result<(), RuleSyntaxError> {
    match value {
        None => Ok(()),
        Some(v) => Err(RuleSyntaxError::invalid_value(name, v)),
    }
}

/// Split a `a|~b|c` list into permitted and restricted values.
fn split_negatable<T>(
    name: &str,
    value: &str,
    permitted: &mut Vec<T>,
    restricted: &mut Vec<T>,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<(), RuleSyntaxError> {
    for item in value.split('|') {
        let (negated, item) = match item.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, item),
        };
        if item.is_empty() {
            return Err(RuleSyntaxError::invalid_value(name, value));
        }
        let parsed = parse(item).ok_or_else(|| RuleSyntaxError::invalid_value(name, value))?;
        if negated {
            restricted.push(parsed);
        } else {
            permitted.push(parsed);
        }
    }
    Ok(())
}
