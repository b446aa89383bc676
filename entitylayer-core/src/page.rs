//! Pagination over query results.
//!
//! [`Pagination`] translates a 1-indexed page number and page size into the
//! skip/limit window of a select query, and [`Page`] carries one page of
//! results together with navigation metadata.

use serde::{Deserialize, Serialize};

use crate::query::SelectQueryBuilder;

/// A single page of results.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items contained in this page.
    pub items: Vec<T>,
    /// Total count of items across all pages.
    pub total: usize,
    /// The next page number (if more pages exist).
    pub next_page: Option<usize>,
    /// The previous page number (if this is not the first page).
    pub previous_page: Option<usize>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            next_page: None,
            previous_page: None,
        }
    }
}

/// A 1-indexed pagination window.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    /// The page number (1-indexed).
    pub page: u64,
    /// Number of items per page.
    pub size: u64,
}

impl Pagination {
    /// Creates a pagination window.
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    /// Returns the number of items to skip for this page.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1) * self.size
    }

    /// Applies this window to a select query builder as skip and limit.
    pub fn apply(&self, builder: SelectQueryBuilder) -> SelectQueryBuilder {
        builder.skip(self.skip()).limit(self.size)
    }

    /// Paginates an already materialized result list.
    ///
    /// This helper is intended for providers that fetch full result sets and
    /// window them afterwards.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let skip = self.skip() as usize;

        if total == 0 || skip >= total {
            return Page::default();
        }

        let end = usize::min(skip + self.size as usize, total);
        let window = items
            .into_iter()
            .skip(skip)
            .take(end - skip)
            .collect();

        Page {
            items: window,
            total,
            next_page: (end < total).then(|| (self.page + 1) as usize),
            previous_page: (self.page > 1).then(|| (self.page - 1) as usize),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, size: 10 }
    }
}
