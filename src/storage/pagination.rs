// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Page/limit pagination shared by every list query.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Requested page. Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageRequest {
    /// 1-based page number (default 1)
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (default 20, max 100)
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }.clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Index window of this page within a result set of `total` items.
    pub fn window(&self, total: usize) -> Range<usize> {
        let req = self.clamped();
        let start = (req.page as usize - 1)
            .saturating_mul(req.limit as usize)
            .min(total);
        let end = start.saturating_add(req.limit as usize).min(total);
        start..end
    }

    pub fn pagination(&self, total: usize) -> Pagination {
        let req = self.clamped();
        let total = total as u64;
        Pagination {
            page: req.page,
            limit: req.limit,
            total,
            total_pages: total.div_ceil(req.limit as u64),
        }
    }
}

/// Pagination metadata returned alongside a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Cut the requested page out of a fully materialized, already ordered list.
    pub fn from_vec(items: Vec<T>, request: PageRequest) -> Self {
        let pagination = request.pagination(items.len());
        let window = request.window(items.len());
        let data = items
            .into_iter()
            .skip(window.start)
            .take(window.len())
            .collect();
        Self { data, pagination }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_are_missing() {
        let req: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, PageRequest::new(1, 20));
    }

    #[test]
    fn limit_and_page_are_clamped() {
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(3, 500).limit, MAX_LIMIT);
    }

    #[test]
    fn window_covers_last_partial_page() {
        let req = PageRequest::new(3, 10);
        assert_eq!(req.window(25), 20..25);
        assert_eq!(req.pagination(25).total_pages, 3);
    }

    #[test]
    fn window_past_the_end_is_empty() {
        let req = PageRequest::new(9, 10);
        assert!(req.window(25).is_empty());
        let page = Page::from_vec((0..25).collect::<Vec<_>>(), req);
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total, 25);
    }

    #[test]
    fn pagination_serializes_camel_case() {
        let json = serde_json::to_value(PageRequest::new(2, 5).pagination(11)).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["page"], 2);
    }
}
