//! Pagination types shared by every listing endpoint.

use serde::Serialize;

/// One page of a listing: hydrated entities in resolved order plus the total
/// match count before OFFSET/LIMIT.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn empty(page: i64, limit: i64) -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            page,
            limit,
        }
    }
}

/// Clamp raw paging parameters to sane values: first page, at least one row.
pub fn clamp_paging(page: i64, limit: i64) -> (i64, i64) {
    (page.max(1), limit.max(1))
}

/// Default page size used when the client sends none.
pub const DEFAULT_LIMIT: i64 = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_floors_page_and_limit() {
        assert_eq!(clamp_paging(0, 0), (1, 1));
        assert_eq!(clamp_paging(-5, -1), (1, 1));
        assert_eq!(clamp_paging(3, 25), (3, 25));
    }

    #[test]
    fn empty_page_echoes_paging() {
        let page = Page::<i32>::empty(2, 10);
        assert_eq!(page.total, 0);
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 10);
        assert!(page.data.is_empty());
    }
}
