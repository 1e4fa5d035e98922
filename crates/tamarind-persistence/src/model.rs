//! Domain model types for the persistence abstraction layer
//!
//! Pagination plus the outcome types returned by the atomic write
//! primitives, decoupled from any specific storage backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Config, ConfigValue, ConfigVersion, Secret};

pub const DEFAULT_PAGE_SIZE: u64 = 30;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Generic paginated result
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total_count: u64,
    pub page_number: u64,
    pub pages_available: u64,
    pub page_items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(total_count: u64, page_number: u64, page_size: u64, page_items: Vec<T>) -> Self {
        Self {
            total_count,
            page_number,
            pages_available: if page_size > 0 {
                total_count.div_ceil(page_size)
            } else {
                0
            },
            page_items,
        }
    }

    pub fn empty() -> Self {
        Self {
            total_count: 0,
            page_number: 0,
            pages_available: 0,
            page_items: Vec::new(),
        }
    }

    /// Slice an already-ordered collection into the requested page
    pub fn from_ordered(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len() as u64;
        let page_items = items
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(request.per_page).unwrap_or(usize::MAX))
            .collect();
        Self::new(total, request.page, request.per_page, page_items)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total_count: self.total_count,
            page_number: self.page_number,
            pages_available: self.pages_available,
            page_items: self.page_items.into_iter().map(f).collect(),
        }
    }
}

/// Normalized page request
///
/// `page` is clamped to at least 1 and `per_page` into `1..=100`, with 0
/// meaning the default of 30.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        let per_page = match per_page {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };
        Self {
            page: page.max(1),
            per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// Conditional append of a new version
#[derive(Clone, Debug)]
pub struct VersionAppend {
    pub config_id: String,
    /// `Config.version` the caller read; the append fails if it moved
    pub expected_version: u32,
    pub version: ConfigVersion,
    /// Make the appended version the served one, archiving the previous
    pub activate: bool,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppendOutcome {
    Appended(Config),
    VersionMismatch { current: u32 },
    /// The config is logically deleted
    ConfigArchived,
    NotFound,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ActivationOutcome {
    Activated {
        config: Config,
        previous_version: Option<u32>,
        previous_value: ConfigValue,
    },
    AlreadyActive(Config),
    VersionArchived,
    ConfigArchived,
    VersionNotFound,
    ConfigNotFound,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SecretWriteOutcome {
    Written(Secret),
    VersionMismatch { current: u32 },
    NotFound,
}

/// Position in a newest-first walk over version history
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryCursor {
    Start,
    Before(u32),
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, per_page: 30 });
        assert_eq!(PageRequest::new(3, 500).per_page, 100);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_huge_page_number_saturates() {
        let request = PageRequest::new(u64::MAX, 100);
        assert_eq!(request.offset(), u64::MAX);

        let page = Page::from_ordered(vec![1, 2, 3], request);
        assert!(page.page_items.is_empty());
        assert_eq!(page.total_count, 3);
        assert_eq!(page.page_number, u64::MAX);
    }

    #[test]
    fn test_page_from_ordered() {
        let items: Vec<u32> = (1..=25).collect();
        let page = Page::from_ordered(items, PageRequest::new(3, 10));

        assert_eq!(page.total_count, 25);
        assert_eq!(page.pages_available, 3);
        assert_eq!(page.page_number, 3);
        assert_eq!(page.page_items, vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let page = Page::from_ordered(vec![1, 2, 3], PageRequest::new(5, 10));
        assert!(page.page_items.is_empty());
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn test_page_map() {
        let page = Page::new(2, 1, 10, vec![1, 2]).map(|n| n * 10);
        assert_eq!(page.page_items, vec![10, 20]);
        assert_eq!(page.pages_available, 1);
    }
}
