//! Composite rule storage over several rule lists.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use nw_core::{HostRule, ListId, NetworkRule, Rule};

use crate::index::RuleIndex;
use crate::list::RuleList;
use crate::scanner::RuleScanner;
use crate::FilterListError;

/// Rule lists joined under one address space of [`RuleIndex`] values.
///
/// Retrieved rules are cached, so a rule indexed by a lookup table is parsed
/// again at most once.
pub struct RuleStorage {
    lists: Vec<Box<dyn RuleList>>,
    by_id: HashMap<ListId, usize>,
    cache: RwLock<HashMap<RuleIndex, Rule>>,
}

impl RuleStorage {
    /// Join `lists`. Fails if two lists share an ID.
    pub fn new(lists: Vec<Box<dyn RuleList>>) -> Result<Self, FilterListError> {
        let mut by_id = HashMap::with_capacity(lists.len());
        for (pos, list) in lists.iter().enumerate() {
            if by_id.insert(list.id(), pos).is_some() {
                return Err(FilterListError::DuplicateListId(list.id()));
            }
        }

        Ok(Self {
            lists,
            by_id,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Scan every list in order.
    ///
    /// Scanners for all lists are opened up front, so a list that cannot be
    /// read fails the whole scan instead of being skipped.
    pub fn scan(&self) -> Result<RuleStorageScanner<'_>, FilterListError> {
        let scanners = self
            .lists
            .iter()
            .map(|list| list.new_scanner())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RuleStorageScanner {
            scanners: scanners.into_iter(),
            current: None,
            error: None,
        })
    }

    /// Get the rule at `idx`.
    pub fn retrieve(&self, idx: RuleIndex) -> Result<Rule, FilterListError> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(rule) = cache.get(&idx) {
                return Ok(rule.clone());
            }
        }

        let list_id = idx.list_id();
        let pos = *self
            .by_id
            .get(&list_id)
            .ok_or(FilterListError::UnknownList(list_id))?;
        let rule = self.lists[pos].retrieve_rule(idx.offset() as usize)?;

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(idx, rule.clone());

        Ok(rule)
    }

    /// Get the network rule at `idx`. Failures are logged.
    pub fn retrieve_network_rule(&self, idx: RuleIndex) -> Option<Arc<NetworkRule>> {
        match self.retrieve(idx) {
            Ok(Rule::Network(rule)) => Some(rule),
            Ok(other) => {
                log::warn!("Rule at {} is not a network rule: {}", idx, other.text());
                None
            }
            Err(e) => {
                log::warn!("Cannot retrieve network rule at {}: {}", idx, e);
                None
            }
        }
    }

    /// Get the host rule at `idx`. Failures are logged.
    pub fn retrieve_host_rule(&self, idx: RuleIndex) -> Option<Arc<HostRule>> {
        match self.retrieve(idx) {
            Ok(Rule::Host(rule)) => Some(rule),
            Ok(other) => {
                log::warn!("Rule at {} is not a host rule: {}", idx, other.text());
                None
            }
            Err(e) => {
                log::warn!("Cannot retrieve host rule at {}: {}", idx, e);
                None
            }
        }
    }

    /// Number of joined lists.
    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    /// Number of cached rules.
    pub fn cache_len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear_cache(&self) {
        self.cache.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl std::fmt::Debug for RuleStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleStorage")
            .field("lists", &self.lists.iter().map(|l| l.id()).collect::<Vec<_>>())
            .field("cached", &self.cache_len())
            .finish()
    }
}

/// Scanner over all lists of a [`RuleStorage`], yielding `(rule, index)`.
///
/// A read error in any list stops the whole scan. Check
/// [`RuleStorageScanner::take_error`] once iteration ends.
pub struct RuleStorageScanner<'a> {
    scanners: std::vec::IntoIter<RuleScanner<'a>>,
    current: Option<RuleScanner<'a>>,
    error: Option<FilterListError>,
}

impl RuleStorageScanner<'_> {
    /// The error that ended the scan early, if any.
    pub fn take_error(&mut self) -> Option<FilterListError> {
        self.error.take()
    }
}

impl Iterator for RuleStorageScanner<'_> {
    type Item = (Rule, RuleIndex);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                self.current = Some(self.scanners.next()?);
            }
            let scanner = self.current.as_mut()?;

            match scanner.next() {
                Some((rule, offset)) => match u32::try_from(offset) {
                    Ok(offset) => return Some((rule, RuleIndex::new(scanner.list_id(), offset))),
                    Err(_) => {
                        log::warn!(
                            "Offset {} in list {} does not fit a rule index, skipping",
                            offset,
                            scanner.list_id()
                        );
                    }
                },
                None => {
                    if let Some(e) = scanner.take_error() {
                        self.error = Some(FilterListError::Io(e));
                        self.scanners = Vec::new().into_iter();
                        self.current = None;
                        return None;
                    }
                    self.current = None;
                }
            }
        }
    }
}
