//! Composite rule index
//!
//! High 32 bits: list ID. Low 32 bits: byte offset of the rule line within
//! that list.

use std::fmt;

use nw_core::ListId;

/// Storage-wide rule handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleIndex(i64);

impl RuleIndex {
    /// Pack a list ID and an offset within that list.
    #[inline]
    pub const fn new(list_id: ListId, offset: u32) -> Self {
        Self((((list_id as u64) << 32) | (offset as u64)) as i64)
    }

    #[inline]
    pub const fn list_id(self) -> ListId {
        ((self.0 as u64) >> 32) as u32
    }

    #[inline]
    pub const fn offset(self) -> u32 {
        self.0 as u64 as u32
    }

    /// Raw 64-bit value.
    #[inline]
    pub const fn to_i64(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn from_i64(v: i64) -> Self {
        Self(v)
    }
}

impl From<RuleIndex> for i64 {
    fn from(idx: RuleIndex) -> Self {
        idx.0
    }
}

impl From<i64> for RuleIndex {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

impl fmt::Display for RuleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.list_id(), self.offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cases = [(0, 0), (1, 0), (1, 21), (7, u32::MAX), (u32::MAX, 0), (u32::MAX, u32::MAX)];
        for (list_id, offset) in cases {
            let idx = RuleIndex::new(list_id, offset);
            assert_eq!(idx.list_id(), list_id);
            assert_eq!(idx.offset(), offset);
            assert_eq!(RuleIndex::from_i64(idx.to_i64()), idx);
        }
    }

    #[test]
    fn test_layout() {
        let idx = RuleIndex::new(2, 5);
        assert_eq!(i64::from(idx), (2 << 32) | 5);
        assert_eq!(idx.to_string(), "2:5");
    }
}
