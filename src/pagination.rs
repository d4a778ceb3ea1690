//! Page/pageSize handling for list endpoints.

use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Offset/limit pair handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    /// Page number derived from offset and limit, so it stays consistent with
    /// whatever was actually queried.
    pub fn current_page(&self) -> u64 {
        self.offset.saturating_add(1).div_ceil(self.limit)
    }

    /// Offset as a SQL `OFFSET` value. Anything past `i64::MAX` is past the end anyway.
    pub fn sql_offset(&self) -> i64 {
        i64::try_from(self.offset).unwrap_or(i64::MAX)
    }

    pub fn sql_limit(&self) -> i64 {
        i64::try_from(self.limit).unwrap_or(i64::MAX)
    }
}

/// `page` and `page_size` must both be at least 1; callers sanitize first.
/// Huge pages saturate to an offset past every row.
pub fn calc_pagination(page: u64, page_size: u64) -> Pagination {
    Pagination {
        offset: page.saturating_sub(1).saturating_mul(page_size),
        limit: page_size,
    }
}

/// Raw `?page=&pageSize=` query values. Kept as strings so garbage input
/// falls back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

impl PageQuery {
    pub fn resolve(&self, config: &PaginationConfig) -> Pagination {
        let page = parse_positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE);
        let page_size = parse_positive(self.page_size.as_deref())
            .unwrap_or(config.default_page_size)
            .min(config.max_page_size);
        calc_pagination(page, page_size)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).filter(|v| *v >= 1)
}

/// Paginated payload: `{ total, currentTotal, currentPage, data }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub total: u64,
    pub current_total: u64,
    pub current_page: u64,
    pub data: Vec<T>,
}

impl<T: Serialize> Page<T> {
    pub fn new(total: u64, pagination: Pagination, data: Vec<T>) -> Self {
        Self {
            total,
            current_total: data.len() as u64,
            current_page: pagination.current_page(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: 100,
        }
    }

    fn query(page: Option<&str>, page_size: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(str::to_string),
            page_size: page_size.map(str::to_string),
        }
    }

    #[test]
    fn third_page_of_ten() {
        let p = calc_pagination(3, 10);
        assert_eq!(p.offset, 20);
        assert_eq!(p.limit, 10);
        assert_eq!(p.current_page(), 3);
    }

    #[test]
    fn current_page_matches_requested_page() {
        for page in 1..=25u64 {
            for size in 1..=12u64 {
                let p = calc_pagination(page, size);
                assert_eq!(p.offset, (page - 1) * size);
                assert_eq!(p.current_page(), page, "page={page} size={size}");
            }
        }
    }

    #[test]
    fn missing_or_invalid_params_use_defaults() {
        let cfg = config();
        assert_eq!(query(None, None).resolve(&cfg), calc_pagination(1, 10));
        assert_eq!(query(Some("0"), Some("0")).resolve(&cfg), calc_pagination(1, 10));
        assert_eq!(query(Some("-2"), Some("abc")).resolve(&cfg), calc_pagination(1, 10));
        assert_eq!(query(Some("4"), Some("5")).resolve(&cfg), calc_pagination(4, 5));
    }

    #[test]
    fn page_size_is_clamped() {
        let p = query(Some("2"), Some("5000")).resolve(&config());
        assert_eq!(p.limit, 100);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn huge_page_saturates() {
        let p = query(Some("18446744073709551615"), Some("10")).resolve(&config());
        assert_eq!(p.offset, u64::MAX);
        assert_eq!(p.limit, 10);
        assert_eq!(p.sql_offset(), i64::MAX);
        assert!(p.current_page() > 1);
    }

    #[test]
    fn page_past_the_end_reports_empty_page() {
        let p = calc_pagination(7, 10);
        let page: Page<u32> = Page::new(12, p, Vec::new());
        assert_eq!(page.current_page, 7);
        assert_eq!(page.current_total, 0);
        assert_eq!(page.total, 12);

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["currentTotal"], 0);
        assert_eq!(json["currentPage"], 7);
        assert!(json["data"].as_array().unwrap().is_empty());
    }
}
