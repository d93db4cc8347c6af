//! Pagination types for bounded, restartable query pages

/// Pagination query parameters (1-based page index)
#[derive(Debug, Clone, Copy)]
pub struct PaginationParams {
    pub page: u64,
    pub limit: u64,
}

impl PaginationParams {
    /// Clamp raw caller input into a sane range: page >= 1, 1 <= limit <= 100.
    pub fn clamped(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(20).clamp(1, 100),
        }
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

/// Paginated response wrapper
#[derive(Debug)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_defaults() {
        let p = PaginationParams::clamped(None, None);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 20);
    }

    #[test]
    fn clamped_bounds() {
        let p = PaginationParams::clamped(Some(0), Some(500));
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 100);
    }

    #[test]
    fn total_pages_rounds_up() {
        let r: PaginatedResult<i32> = PaginatedResult::new(vec![], 21, 1, 20);
        assert_eq!(r.total_pages, 2);
        let r: PaginatedResult<i32> = PaginatedResult::new(vec![], 40, 1, 20);
        assert_eq!(r.total_pages, 2);
        let r: PaginatedResult<i32> = PaginatedResult::new(vec![], 0, 1, 20);
        assert_eq!(r.total_pages, 0);
    }
}
