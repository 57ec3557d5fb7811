//! Cursor based pagination.
//!
//! Every paginated collection is ordered newest-to-oldest by a `u64` ordinal
//! (block number for blocks, transaction ordinal for transactions and
//! contracts). A cursor is the opaque rendering of one such ordinal.

use serde::{Deserialize, Serialize};

/// Largest ordinal of any collection; ordinals are stored as signed 64-bit
/// integers.
pub const MAX_ORDINAL: u64 = i64::MAX as u64;

/// Opaque position marker inside an ordered collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn from_ordinal(ordinal: u64) -> Self {
        Self(format!("{ordinal:#x}"))
    }

    /// Decode the ordinal; `None` when the cursor was not produced by us,
    /// including values past [`MAX_ORDINAL`].
    pub fn ordinal(&self) -> Option<u64> {
        let digits = self.0.strip_prefix("0x")?;
        u64::from_str_radix(digits, 16)
            .ok()
            .filter(|ordinal| *ordinal <= MAX_ORDINAL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a collection, always ordered newest-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor of the newest entry on the page.
    pub first: Option<Cursor>,
    /// Cursor of the oldest entry on the page.
    pub last: Option<Cursor>,
    /// Older entries exist past `last`.
    pub has_next: bool,
    /// Newer entries exist before `first`.
    pub has_previous: bool,
    /// Size of the whole collection.
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty(total: u64) -> Self {
        Self {
            items: Vec::new(),
            first: None,
            last: None,
            has_next: false,
            has_previous: false,
            total,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            first: self.first,
            last: self.last,
            has_next: self.has_next,
            has_previous: self.has_previous,
            total: self.total,
        }
    }
}

/// Direction and bounds of a page request.
///
/// A positive count scans toward older entries, a negative one toward newer
/// entries. Without a cursor the scan starts at the newest (positive) or the
/// oldest (negative) entry; with one, the cursor itself is excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub after: Option<u64>,
    pub limit: u32,
    pub toward_older: bool,
}

impl PageRequest {
    /// Build a request, clamping `|count|` to `max`.
    pub fn new(cursor: Option<u64>, count: i32, max: u32) -> Self {
        Self {
            after: cursor,
            limit: count.unsigned_abs().min(max),
            toward_older: count >= 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_foreign_cursor_does_not_decode() {
        assert_eq!(Cursor::from("abc").ordinal(), None);
        assert_eq!(Cursor::from("0xzz").ordinal(), None);
        assert_eq!(Cursor::from("0x1f").ordinal(), Some(31));
    }

    #[test]
    fn test_cursor_past_signed_range_does_not_decode() {
        assert_eq!(Cursor::from("0xffffffffffffffff").ordinal(), None);
        assert_eq!(Cursor::from("0x8000000000000000").ordinal(), None);
        assert_eq!(
            Cursor::from("0x7fffffffffffffff").ordinal(),
            Some(MAX_ORDINAL)
        );
    }

    #[test]
    fn test_page_request_clamps_both_directions() {
        let forward = PageRequest::new(None, 500, 50);
        assert_eq!(forward.limit, 50);
        assert!(forward.toward_older);

        let backward = PageRequest::new(Some(7), -500, 50);
        assert_eq!(backward.limit, 50);
        assert!(!backward.toward_older);
        assert_eq!(backward.after, Some(7));

        assert!(PageRequest::new(None, 0, 50).is_empty());
    }

    proptest! {
        #[test]
        fn prop_cursor_preserves_ordinal(ordinal in any::<u64>()) {
            prop_assert_eq!(Cursor::from_ordinal(ordinal).ordinal(), Some(ordinal));
        }
    }
}
