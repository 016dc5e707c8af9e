//! Engine façade for browser and proxy filtering.

use std::sync::Arc;

use nw_core::{MatchingResult, Request, RequestType};
use nw_filterlist::{FilterListError, RuleStorage};

use crate::network_engine::NetworkEngine;

/// Resolves requests against network rules, taking document-level
/// exceptions on the source page into account.
pub struct Engine {
    network_engine: NetworkEngine,
}

impl Engine {
    pub fn new(storage: Arc<RuleStorage>) -> Result<Self, FilterListError> {
        Ok(Self {
            network_engine: NetworkEngine::new(storage)?,
        })
    }

    /// Match `req` and its source page.
    ///
    /// The source URL is matched as a document request so that `$document`,
    /// `$urlblock` and `$genericblock` exceptions for the page apply.
    pub fn match_request(&self, req: &Request) -> MatchingResult {
        let rules = self.network_engine.match_all(req);

        let source_rules = if req.source_url.is_empty() {
            Vec::new()
        } else {
            let mut source_req = Request::new(&req.source_url, "", RequestType::DOCUMENT);
            source_req.client_ip = req.client_ip;
            source_req.client_name.push_str(&req.client_name);
            source_req.sorted_client_tags.extend_from_slice(&req.sorted_client_tags);
            self.network_engine.match_all(&source_req)
        };

        MatchingResult::new(rules, source_rules)
    }

    pub fn network_engine(&self) -> &NetworkEngine {
        &self.network_engine
    }
}
