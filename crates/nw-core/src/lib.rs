//! Netwarden Core Library
//!
//! Rule model, request model and conflict resolution shared by the rule
//! storage and the matching engines.
//!
//! # Modules
//!
//! - `rules`: Rule line parser and the network, host and cosmetic rule types
//! - `request`: Reusable request values matched against network rules
//! - `matching_result`: Conflict resolution between matching rules
//! - `psl`: eTLD+1 extraction and domain walking
//! - `url`: Fast URL parsing without allocations
//! - `types`: Shared bit masks and small value types
//! - `error`: Rule syntax errors

pub mod error;
pub mod matching_result;
pub mod psl;
pub mod request;
pub mod rules;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use error::RuleSyntaxError;
pub use matching_result::{dns_basic_rule, MatchingResult};
pub use request::Request;
pub use rules::{parse_rule, CosmeticRule, HostRule, NetworkRule, Rule};
pub use types::{CosmeticOption, ListId, RequestType, RrType, RuleOption};
