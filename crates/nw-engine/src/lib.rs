//! Netwarden Matching Engines
//!
//! Index construction happens once, when an engine is built from a
//! [`RuleStorage`](nw_filterlist::RuleStorage). After that every engine is
//! read-only and can be shared between threads for matching.
//!
//! # Modules
//!
//! - `lookup`: Shortcut, domain and sequential scan lookup tables
//! - `network_engine`: Lookup table chain for network rules
//! - `dns_engine`: Host rules and host-level network rules for DNS
//! - `engine`: Façade resolving requests with their source page

pub mod dns_engine;
pub mod engine;
pub mod lookup;
pub mod network_engine;

pub use dns_engine::{DnsEngine, DnsRequest, DnsResult};
pub use engine::Engine;
pub use network_engine::NetworkEngine;
