//! Pagination and listing parameters.

use serde::{Deserialize, Serialize};

/// One page of results plus the pagination bookkeeping callers need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching items across all pages
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    /// Build a page from already-sliced items.
    pub fn new(items: Vec<T>, total: usize, limit: usize, offset: usize) -> Self {
        Self {
            items,
            total,
            limit,
            offset,
        }
    }

    /// An empty page carrying only the requested window.
    pub fn empty(limit: usize, offset: usize) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            limit,
            offset,
        }
    }

    /// Whether another page exists past this one.
    pub fn has_more(&self) -> bool {
        self.offset + self.limit < self.total
    }

    /// Map page items while keeping pagination intact.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Sort order for workflow listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    DateNewest,
    DateOldest,
}

/// Filters and sorting for workflow listings.
///
/// With no sort order set, listings rank by priority desc, urgency desc
/// (nulls last), then date desc.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOptions {
    #[serde(default)]
    pub sort_by: Option<SortOrder>,
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default)]
    pub attachments_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_more_boundary() {
        // 25 total, pages of 10: offsets 0 and 10 have more, 20 does not
        assert!(Page::<u32>::new(vec![], 25, 10, 0).has_more());
        assert!(Page::<u32>::new(vec![], 25, 10, 10).has_more());
        assert!(!Page::<u32>::new(vec![], 25, 10, 20).has_more());
        // exact fit
        assert!(!Page::<u32>::new(vec![], 20, 10, 10).has_more());
    }

    #[test]
    fn empty_page() {
        let page = Page::<u32>::empty(10, 5);
        assert_eq!(page.total, 0);
        assert!(!page.has_more());
        assert!(page.items.is_empty());
    }

    #[test]
    fn map_preserves_pagination() {
        let page = Page::new(vec![1, 2, 3], 9, 3, 3);
        let mapped = page.map(|n| n * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert_eq!(mapped.total, 9);
        assert_eq!(mapped.offset, 3);
        assert!(mapped.has_more());
    }

    #[test]
    fn sort_order_serialization() {
        assert_eq!(
            serde_json::to_string(&SortOrder::DateNewest).unwrap(),
            "\"date_newest\""
        );
        let order: SortOrder = serde_json::from_str("\"date_oldest\"").unwrap();
        assert_eq!(order, SortOrder::DateOldest);
    }
}
