//! Hosts-file rules: `IP hostname [hostname...]`

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::error::RuleSyntaxError;
use crate::psl::is_valid_hostname;
use crate::types::ListId;

/// A hosts-file rule binding one or more hostnames to an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRule {
    rule_text: String,
    list_id: ListId,
    ip: IpAddr,
    hostnames: Vec<String>,
}

impl HostRule {
    /// Parse `IP host [host...] [# comment]`, or a bare hostname which is
    /// bound to `0.0.0.0`.
    pub fn parse(text: &str, list_id: ListId) -> Result<Self, RuleSyntaxError> {
        let invalid = || RuleSyntaxError::InvalidHostRule(text.to_string());

        let mut fields = text.split_whitespace().take_while(|f| !f.starts_with('#'));
        let first = fields.next().ok_or_else(invalid)?;

        let (ip, hostnames) = match first.parse::<IpAddr>() {
            Ok(ip) => {
                let hostnames: Vec<String> = fields
                    .filter(|h| is_valid_hostname(h))
                    .map(str::to_ascii_lowercase)
                    .collect();
                (ip, hostnames)
            }
            Err(_) => {
                if fields.next().is_some() || !is_valid_hostname(first) || !first.contains('.') {
                    return Err(invalid());
                }
                (IpAddr::V4(Ipv4Addr::UNSPECIFIED), vec![first.to_ascii_lowercase()])
            }
        };

        if hostnames.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            rule_text: text.to_string(),
            list_id,
            ip,
            hostnames,
        })
    }

    pub fn text(&self) -> &str {
        &self.rule_text
    }

    pub fn list_id(&self) -> ListId {
        self.list_id
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Lower-cased hostnames bound by this rule.
    pub fn hostnames(&self) -> &[String] {
        &self.hostnames
    }

    pub fn matches(&self, hostname: &str) -> bool {
        self.hostnames.iter().any(|h| h.eq_ignore_ascii_case(hostname))
    }
}

impl fmt::Display for HostRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rule_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hosts_line() {
        let rule = HostRule::parse("192.168.0.1 example.local Alias.local # home", 3).unwrap();
        assert_eq!(rule.ip(), "192.168.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(rule.hostnames(), ["example.local", "alias.local"]);
        assert_eq!(rule.list_id(), 3);
        assert!(rule.matches("ALIAS.local"));
        assert!(!rule.matches("other.local"));
    }

    #[test]
    fn test_parse_ipv6() {
        let rule = HostRule::parse("2000::1 example.local", 1).unwrap();
        assert!(rule.ip().is_ipv6());
    }

    #[test]
    fn test_parse_bare_hostname() {
        let rule = HostRule::parse("example.org", 1).unwrap();
        assert_eq!(rule.ip(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(rule.hostnames(), ["example.org"]);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(HostRule::parse("||example.org^", 1).is_err());
        assert!(HostRule::parse("127.0.0.1", 1).is_err());
        assert!(HostRule::parse("example.org other.org", 1).is_err());
        assert!(HostRule::parse("localhost", 1).is_err());
        assert!(HostRule::parse("", 1).is_err());
    }
}
