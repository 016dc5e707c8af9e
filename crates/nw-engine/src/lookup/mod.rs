//! Lookup tables
//!
//! Each table narrows the rule corpus down to candidates for a request.
//! Tables are tried in a fixed order when rules are added; a table refuses
//! rules it cannot index.

mod domains;
mod seqscan;
mod shortcuts;

use std::sync::Arc;

use nw_core::{NetworkRule, Request};
use nw_filterlist::RuleIndex;

pub use domains::DomainsTable;
pub use seqscan::SeqScanTable;
pub use shortcuts::ShortcutsTable;

/// A rule index for network rules.
pub trait Table: Send + Sync {
    /// Short name for statistics.
    fn name(&self) -> &'static str;

    /// Index `rule`. Returns `false` if the table does not accept it.
    fn add(&mut self, rule: &Arc<NetworkRule>, idx: RuleIndex) -> bool;

    /// Append every rule matching `req`, each at most once.
    fn append_matching(&self, matching: &mut Vec<Arc<NetworkRule>>, req: &Request);

    /// Number of rules added.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
