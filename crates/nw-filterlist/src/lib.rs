//! Netwarden Rule Lists
//!
//! Sources of raw rule text and the composite storage the matching engines
//! index into.
//!
//! # Architecture
//!
//! Each [`RuleList`] owns the text of one filter list and can either scan it
//! line by line or re-parse a single rule at a byte offset. [`RuleStorage`]
//! joins several lists and addresses every rule with a [`RuleIndex`] that
//! packs the list ID and the offset into one 64-bit value, so lookup tables
//! only keep integers and rules are materialized on demand.
//!
//! # Modules
//!
//! - `index`: Composite rule index encoding
//! - `scanner`: Line scanner over a single list
//! - `list`: In-memory and file-backed rule lists
//! - `storage`: Multi-list storage with a retrieval cache

pub mod index;
pub mod list;
pub mod scanner;
pub mod storage;

use nw_core::{ListId, RuleSyntaxError};

pub use index::RuleIndex;
pub use list::{
    BytesConfig, BytesRuleList, FileConfig, FileRuleList, RuleList, StringConfig, StringRuleList,
};
pub use scanner::RuleScanner;
pub use storage::{RuleStorage, RuleStorageScanner};

/// Error type for rule lists and rule storage.
#[derive(Debug, thiserror::Error)]
pub enum FilterListError {
    #[error("Duplicate list ID: {0}")]
    DuplicateListId(ListId),
    #[error("Unknown list ID: {0}")]
    UnknownList(ListId),
    #[error("No rule at offset {offset} of list {list_id}")]
    RuleRetrieval { list_id: ListId, offset: usize },
    #[error("Rule syntax error: {0}")]
    Syntax(#[from] RuleSyntaxError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
