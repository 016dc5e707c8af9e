//! Rule lists: in-memory bytes, owned strings and files.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::Deserialize;

use nw_core::{parse_rule, ListId, Rule};

use crate::scanner::RuleScanner;
use crate::FilterListError;

/// A source of rule text addressable by byte offset.
pub trait RuleList: Send + Sync {
    fn id(&self) -> ListId;

    /// Create a scanner positioned at the start of the list.
    fn new_scanner(&self) -> Result<RuleScanner<'_>, FilterListError>;

    /// Parse the rule whose line starts at `offset`.
    fn retrieve_rule(&self, offset: usize) -> Result<Rule, FilterListError>;
}

/// Parse a retrieved line. Blank lines and comments are retrieval errors.
fn parse_line(line: &[u8], list_id: ListId, offset: usize) -> Result<Rule, FilterListError> {
    let line = String::from_utf8_lossy(line);
    match parse_rule(line.trim(), list_id)? {
        Some(rule) => Ok(rule),
        None => Err(FilterListError::RuleRetrieval { list_id, offset }),
    }
}

/// Slice the line starting at `offset`, without its terminator.
fn line_at(data: &[u8], offset: usize) -> Option<&[u8]> {
    let rest = data.get(offset..).filter(|rest| !rest.is_empty())?;
    let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
    Some(&rest[..end])
}

fn retrieve_from_memory(
    data: &[u8],
    list_id: ListId,
    offset: usize,
) -> Result<Rule, FilterListError> {
    let line = line_at(data, offset).ok_or(FilterListError::RuleRetrieval { list_id, offset })?;
    parse_line(line, list_id, offset)
}

// =============================================================================
// Bytes
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct BytesConfig {
    pub id: ListId,
    pub data: Vec<u8>,
    pub ignore_cosmetic: bool,
}

/// Rule list over an in-memory byte buffer.
#[derive(Debug)]
pub struct BytesRuleList {
    id: ListId,
    data: Vec<u8>,
    ignore_cosmetic: bool,
}

impl BytesRuleList {
    pub fn new(config: BytesConfig) -> Self {
        Self {
            id: config.id,
            data: config.data,
            ignore_cosmetic: config.ignore_cosmetic,
        }
    }
}

impl RuleList for BytesRuleList {
    fn id(&self) -> ListId {
        self.id
    }

    fn new_scanner(&self) -> Result<RuleScanner<'_>, FilterListError> {
        Ok(RuleScanner::new(self.data.as_slice(), self.id, self.ignore_cosmetic))
    }

    fn retrieve_rule(&self, offset: usize) -> Result<Rule, FilterListError> {
        retrieve_from_memory(&self.data, self.id, offset)
    }
}

// =============================================================================
// String
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct StringConfig {
    pub id: ListId,
    pub text: String,
    pub ignore_cosmetic: bool,
}

/// Rule list over an owned string.
#[derive(Debug)]
pub struct StringRuleList {
    id: ListId,
    text: String,
    ignore_cosmetic: bool,
}

impl StringRuleList {
    pub fn new(config: StringConfig) -> Self {
        Self {
            id: config.id,
            text: config.text,
            ignore_cosmetic: config.ignore_cosmetic,
        }
    }
}

impl RuleList for StringRuleList {
    fn id(&self) -> ListId {
        self.id
    }

    fn new_scanner(&self) -> Result<RuleScanner<'_>, FilterListError> {
        Ok(RuleScanner::new(self.text.as_bytes(), self.id, self.ignore_cosmetic))
    }

    fn retrieve_rule(&self, offset: usize) -> Result<Rule, FilterListError> {
        retrieve_from_memory(self.text.as_bytes(), self.id, offset)
    }
}

// =============================================================================
// File
// =============================================================================

/// File-backed list configuration. Deserializable so list manifests can be
/// loaded from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub id: ListId,
    pub path: PathBuf,
    #[serde(default)]
    pub ignore_cosmetic: bool,
}

/// Rule list read from a file.
///
/// Scanners open their own handle. Retrieval shares one handle, so reads are
/// serialized by a mutex.
#[derive(Debug)]
pub struct FileRuleList {
    id: ListId,
    path: PathBuf,
    ignore_cosmetic: bool,
    reader: Mutex<BufReader<File>>,
}

impl FileRuleList {
    pub fn new(config: FileConfig) -> Result<Self, FilterListError> {
        let file = File::open(&config.path)?;
        Ok(Self {
            id: config.id,
            path: config.path,
            ignore_cosmetic: config.ignore_cosmetic,
            reader: Mutex::new(BufReader::new(file)),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl RuleList for FileRuleList {
    fn id(&self) -> ListId {
        self.id
    }

    fn new_scanner(&self) -> Result<RuleScanner<'_>, FilterListError> {
        let file = File::open(&self.path)?;
        Ok(RuleScanner::new(BufReader::new(file), self.id, self.ignore_cosmetic))
    }

    fn retrieve_rule(&self, offset: usize) -> Result<Rule, FilterListError> {
        let mut line = Vec::new();
        {
            let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
            reader.seek(SeekFrom::Start(offset as u64))?;
            reader.read_until(b'\n', &mut line)?;
        }

        parse_line(&line, self.id, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nw_core::rules::CosmeticKind;

    const TEXT: &str = "||example.org\n! test\n##banner";

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
    }

    fn check_list(list: &dyn RuleList) {
        assert_eq!(list.id(), 1);

        let scanned: Vec<(Rule, usize)> = list.new_scanner().unwrap().collect();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].0.text(), "||example.org");
        assert_eq!(scanned[0].1, 0);
        assert_eq!(scanned[1].0.text(), "##banner");
        assert_eq!(scanned[1].1, 21);

        let rule = list.retrieve_rule(0).unwrap();
        assert_eq!(rule, scanned[0].0);
        assert!(rule.as_network().is_some());

        let rule = list.retrieve_rule(21).unwrap();
        match &rule {
            Rule::Cosmetic(c) => assert_eq!(c.kind(), CosmeticKind::ElementHiding),
            other => panic!("expected cosmetic rule, got {other:?}"),
        }

        // Comment line
        assert!(matches!(
            list.retrieve_rule(14),
            Err(FilterListError::RuleRetrieval { list_id: 1, offset: 14 })
        ));
        // Past the end
        assert!(matches!(
            list.retrieve_rule(1000),
            Err(FilterListError::RuleRetrieval { .. })
        ));
    }

    #[test]
    fn test_bytes_rule_list() {
        let list = BytesRuleList::new(BytesConfig {
            id: 1,
            data: TEXT.as_bytes().to_vec(),
            ignore_cosmetic: false,
        });
        check_list(&list);
    }

    #[test]
    fn test_string_rule_list() {
        let list = StringRuleList::new(StringConfig {
            id: 1,
            text: TEXT.to_string(),
            ignore_cosmetic: false,
        });
        check_list(&list);
    }

    #[test]
    fn test_file_rule_list() {
        let list = FileRuleList::new(FileConfig {
            id: 1,
            path: fixture("test_file_rule_list.txt"),
            ignore_cosmetic: false,
        })
        .unwrap();
        check_list(&list);

        // Retrieval order does not matter.
        assert_eq!(list.retrieve_rule(21).unwrap().text(), "##banner");
        assert_eq!(list.retrieve_rule(0).unwrap().text(), "||example.org");
    }

    #[test]
    fn test_file_hosts_offsets() {
        let list = FileRuleList::new(FileConfig {
            id: 5,
            path: fixture("hosts.txt"),
            ignore_cosmetic: true,
        })
        .unwrap();

        let scanned: Vec<usize> = list.new_scanner().unwrap().map(|(_, o)| o).collect();
        assert_eq!(scanned, vec![16, 42, 65, 116]);

        let rule = list.retrieve_rule(65).unwrap();
        let host = rule.as_host().unwrap();
        assert_eq!(host.hostnames(), ["ads.example", "tracker.example"]);
        assert_eq!(list.retrieve_rule(116).unwrap().text(), "||blocked.example^");
        assert!(matches!(list.retrieve_rule(64), Err(FilterListError::RuleRetrieval { .. })));
    }

    #[test]
    fn test_ignore_cosmetic() {
        let list = StringRuleList::new(StringConfig {
            id: 1,
            text: TEXT.to_string(),
            ignore_cosmetic: true,
        });
        let offsets: Vec<usize> = list.new_scanner().unwrap().map(|(_, o)| o).collect();
        assert_eq!(offsets, vec![0]);
    }

    #[test]
    fn test_retrieve_syntax_error() {
        let list = StringRuleList::new(StringConfig {
            id: 2,
            text: "||example.org^$bogus\n".to_string(),
            ignore_cosmetic: false,
        });
        assert_eq!(list.new_scanner().unwrap().count(), 0);
        assert!(matches!(list.retrieve_rule(0), Err(FilterListError::Syntax(_))));
    }

    #[test]
    fn test_file_missing() {
        let result = FileRuleList::new(FileConfig {
            id: 1,
            path: fixture("does_not_exist.txt"),
            ignore_cosmetic: false,
        });
        assert!(matches!(result, Err(FilterListError::Io(_))));
    }

    #[test]
    fn test_file_config_json() {
        let config: FileConfig =
            serde_json::from_str(r#"{"id": 3, "path": "lists/hosts.txt"}"#).unwrap();
        assert_eq!(config.id, 3);
        assert_eq!(config.path, PathBuf::from("lists/hosts.txt"));
        assert!(!config.ignore_cosmetic);
    }
}
