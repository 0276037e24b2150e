/// Page/limit windowing for aggregated result sets
///
/// Pages are 1-based. Callers that require explicit paging use
/// [`PageParams::required`]; the rest default to page 1, limit 10.
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Validated 1-based paging window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    /// Both values must be present and positive
    pub fn required(page: Option<i64>, limit: Option<i64>) -> Result<Self> {
        match (page, limit) {
            (Some(p), Some(l)) if p >= 1 && l >= 1 => Ok(Self {
                page: p,
                limit: l.min(MAX_LIMIT),
            }),
            _ => Err(AppError::BadRequest(
                "page and limit are required and must be positive".to_string(),
            )),
        }
    }

    /// Missing or invalid values fall back to page=1, limit=10
    pub fn or_default(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE);
        let limit = limit
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Self { page, limit }
    }

    /// SQL OFFSET for this window
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// One page of an aggregate result, with totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_items: i64, params: PageParams) -> Self {
        Self {
            items,
            total_items,
            total_pages: total_pages(total_items, params.limit),
            current_page: params.page,
        }
    }
}

fn total_pages(total_items: i64, limit: i64) -> i64 {
    if total_items <= 0 {
        0
    } else {
        (total_items + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_or_nonpositive() {
        assert!(PageParams::required(None, Some(10)).is_err());
        assert!(PageParams::required(Some(1), None).is_err());
        assert!(PageParams::required(Some(0), Some(10)).is_err());
        assert!(PageParams::required(Some(1), Some(-5)).is_err());

        let params = PageParams::required(Some(2), Some(10)).unwrap();
        assert_eq!(params.offset(), 10);
    }

    #[test]
    fn defaults_coerce_invalid_values() {
        let params = PageParams::or_default(Some(-3), None);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);

        let capped = PageParams::or_default(Some(1), Some(10_000));
        assert_eq!(capped.limit, 100);
    }

    #[test]
    fn total_pages_is_ceiling_division() {
        // 25 items at limit 10 -> 3 pages
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(30, 10), 3);
        assert_eq!(total_pages(31, 10), 4);
        assert_eq!(total_pages(0, 10), 0);
    }

    #[test]
    fn paginated_reports_window() {
        let params = PageParams::required(Some(2), Some(10)).unwrap();
        let page = Paginated::new(vec![11, 12, 13], 25, params);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_items, 25);
    }
}
