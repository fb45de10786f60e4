//! Offset/limit pagination for application listings

use serde::Serialize;

/// Page size used when the caller does not ask for one
pub const DEFAULT_LIMIT: i64 = 20;

/// Largest page a caller may request
pub const MAX_LIMIT: i64 = 100;

/// Sanitized offset + limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Rows to skip (never negative)
    pub offset: i64,
    /// Rows to return, within [1, MAX_LIMIT]
    pub limit: i64,
}

impl PageRequest {
    /// Build a page request from raw, possibly out-of-range, caller input
    ///
    /// # Examples
    /// ```
    /// use hire_intake::pagination::{PageRequest, MAX_LIMIT};
    ///
    /// let p = PageRequest::new(Some(-5), Some(1000));
    /// assert_eq!(p.offset, 0);
    /// assert_eq!(p.limit, MAX_LIMIT);
    /// ```
    pub fn new(offset: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            offset: offset.unwrap_or(0).max(0),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            offset: request.offset,
            limit: request.limit,
        }
    }
}
