use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// 1-based page request; out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit.clamp(1, MAX_PAGE_SIZE))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

/// One page of a listing plus the total count across all pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let limit = request.limit();
        let total_pages = if total <= 0 {
            0
        } else {
            ((total + limit - 1) / limit) as u32
        };
        Self {
            items,
            total,
            page: request.page.max(1),
            limit: limit as u32,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        let request = PageRequest::new(0, 1000);
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, MAX_PAGE_SIZE);
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(3, 25);
        assert_eq!(request.offset(), 50);
        assert_eq!(request.limit(), 25);
    }

    #[test]
    fn test_page_total_pages() {
        let page: Page<u8> = Page::new(vec![], 0, PageRequest::default());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next());

        let page: Page<u8> = Page::new(vec![1, 2], 41, PageRequest::new(2, 20));
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
    }

    #[test]
    fn test_page_tolerates_unclamped_request() {
        let request = PageRequest { page: 0, limit: 0 };
        assert_eq!(request.offset(), 0);

        let page: Page<u8> = Page::new(vec![], 5, request);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);
        assert_eq!(page.total_pages, 5);
    }
}
