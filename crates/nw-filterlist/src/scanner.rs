//! Sequential scanner over one rule list.

use std::io::{self, BufRead};

use nw_core::rules::is_cosmetic;
use nw_core::{parse_rule, ListId, Rule};

/// Yields `(rule, offset)` pairs, where `offset` is the byte offset of the
/// start of the rule's line.
///
/// Blank lines, comments and unparsable lines are skipped. With
/// `ignore_cosmetic`, cosmetic lines are skipped before parsing. A read
/// error ends the scan and is kept for [`RuleScanner::take_error`].
pub struct RuleScanner<'a> {
    reader: Box<dyn BufRead + 'a>,
    list_id: ListId,
    ignore_cosmetic: bool,
    pos: usize,
    buf: Vec<u8>,
    error: Option<io::Error>,
}

impl<'a> RuleScanner<'a> {
    pub fn new(reader: impl BufRead + 'a, list_id: ListId, ignore_cosmetic: bool) -> Self {
        Self {
            reader: Box::new(reader),
            list_id,
            ignore_cosmetic,
            pos: 0,
            buf: Vec::new(),
            error: None,
        }
    }

    pub fn list_id(&self) -> ListId {
        self.list_id
    }

    /// The read error that ended the scan, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }
}

impl Iterator for RuleScanner<'_> {
    type Item = (Rule, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            let start = self.pos;
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(n) => self.pos += n,
                Err(e) => {
                    log::error!("Failed to read list {} at offset {}: {}", self.list_id, start, e);
                    self.error = Some(e);
                    return None;
                }
            }

            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim();
            if line.is_empty() || (self.ignore_cosmetic && is_cosmetic(line)) {
                continue;
            }

            match parse_rule(line, self.list_id) {
                Ok(Some(rule)) => return Some((rule, start)),
                Ok(None) => continue,
                Err(e) => {
                    log::debug!("Skipping line at {}:{}: {}", self.list_id, start, e);
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Read};

    /// Serves `data`, then fails every read.
    struct FailingReader {
        data: &'static [u8],
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(io::ErrorKind::Other, "device gone"));
            }
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_scan_offsets() {
        let text = "||example.org\n! test\n##banner";
        let scanned: Vec<(String, usize)> = RuleScanner::new(text.as_bytes(), 1, false)
            .map(|(rule, offset)| (rule.text().to_string(), offset))
            .collect();
        assert_eq!(
            scanned,
            vec![("||example.org".to_string(), 0), ("##banner".to_string(), 21)]
        );
    }

    #[test]
    fn test_scan_ignore_cosmetic() {
        let text = "||example.org\n! test\n##banner";
        let scanned: Vec<usize> = RuleScanner::new(text.as_bytes(), 1, true)
            .map(|(_, offset)| offset)
            .collect();
        assert_eq!(scanned, vec![0]);
    }

    #[test]
    fn test_scan_skips_invalid_and_blank() {
        let text = "\r\n  \n||a.example^$bogus\n\t||b.example^\r\n";
        let scanned: Vec<(String, usize)> = RuleScanner::new(text.as_bytes(), 4, false)
            .map(|(rule, offset)| (rule.text().to_string(), offset))
            .collect();
        assert_eq!(scanned, vec![("||b.example^".to_string(), 24)]);
    }

    #[test]
    fn test_scan_list_id() {
        let scanner = RuleScanner::new("||a.example^".as_bytes(), 9, false);
        assert_eq!(scanner.list_id(), 9);
        let (rule, _) = scanner.into_iter().next().unwrap();
        assert_eq!(rule.list_id(), 9);
    }

    #[test]
    fn test_scan_keeps_read_error() {
        let reader = BufReader::new(FailingReader {
            data: b"||a.example^\n||b.example",
        });
        let mut scanner = RuleScanner::new(reader, 3, false);

        let (rule, offset) = scanner.next().unwrap();
        assert_eq!((rule.text(), offset), ("||a.example^", 0));
        assert!(scanner.next().is_none());

        let err = scanner.take_error().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(scanner.take_error().is_none());
    }

    #[test]
    fn test_scan_clean_end_has_no_error() {
        let mut scanner = RuleScanner::new("||a.example^\n".as_bytes(), 1, false);
        assert_eq!(scanner.by_ref().count(), 1);
        assert!(scanner.take_error().is_none());
    }
}
