//! Page-wise retrieval: `(first, offset)` clauses and page counts.

use serde::{Deserialize, Serialize};

use crate::error::{InkgraphError, Result};

/// A validated, 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Pagination {
    /// Build a page request. `page` starts at 1 and `page_size` must be positive.
    pub fn new(page: u32, page_size: u32) -> Result<Self> {
        if page == 0 {
            return Err(InkgraphError::invalid("page numbers start at 1"));
        }
        if page_size == 0 {
            return Err(InkgraphError::invalid("page size must be greater than 0"));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items to return (`first`).
    pub fn first(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Number of items to skip: `page_size * (page - 1)`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_size) * u64::from(self.page - 1)
    }
}

/// `ceil(total / page_size)`. Zero items means zero pages.
pub fn page_count(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}

/// One page of a larger result set, with the total it was cut from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Assemble a page from items and the total count reported alongside them.
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            total_pages: page_count(total, pagination.page_size()),
            page: pagination.page(),
            page_size: pagination.page_size(),
        }
    }
}
