//! Offset pagination helpers shared by every listing endpoint.

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 50;

/// A validated page window. `page` is 1-based and `per_page` is within `1..=MAX_PER_PAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        let page = if page == 0 { DEFAULT_PAGE } else { page };
        let per_page = if per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            per_page.min(MAX_PER_PAGE)
        };
        Self { page, per_page }
    }

    /// Build a window from raw query values. Anything that is not a positive
    /// integer falls back to the default for that value.
    pub fn from_params(page: Option<&str>, per_page: Option<&str>) -> Self {
        let page = page.and_then(parse_positive).unwrap_or(DEFAULT_PAGE);
        let per_page = per_page.and_then(parse_positive).unwrap_or(DEFAULT_PER_PAGE);
        Self::new(page, per_page)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    let value: u64 = raw.trim().parse().ok()?;
    if value == 0 {
        return None;
    }
    Some(u32::try_from(value).unwrap_or(u32::MAX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_num: Option<u32>,
    pub prev_num: Option<u32>,
}

impl PageMeta {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let per_page = u64::from(request.per_page);
        let pages = u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX);
        let page = request.page;
        let has_next = page < pages;
        let has_prev = page > 1;

        Self {
            page,
            per_page: request.per_page,
            total,
            pages,
            has_next,
            has_prev,
            next_num: has_next.then(|| page + 1),
            prev_num: has_prev.then(|| page - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let request = PageRequest::from_params(Some("abc"), Some("-4"));
        assert_eq!(request.page(), DEFAULT_PAGE);
        assert_eq!(request.per_page(), DEFAULT_PER_PAGE);

        let request = PageRequest::from_params(Some("0"), Some("0"));
        assert_eq!(request, PageRequest::default());
    }

    #[test]
    fn per_page_is_capped() {
        let request = PageRequest::from_params(None, Some("500"));
        assert_eq!(request.per_page(), MAX_PER_PAGE);
    }

    #[test]
    fn offset_counts_whole_pages() {
        let request = PageRequest::new(3, 5);
        assert_eq!(request.offset(), 10);
    }

    #[test]
    fn meta_for_middle_page() {
        let meta = PageMeta::new(PageRequest::new(2, 5), 12);
        assert_eq!(meta.pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);
        assert_eq!(meta.next_num, Some(3));
        assert_eq!(meta.prev_num, Some(1));
    }

    #[test]
    fn meta_past_last_page() {
        let meta = PageMeta::new(PageRequest::new(9, 5), 12);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
        assert_eq!(meta.next_num, None);
    }

    #[test]
    fn meta_for_empty_result() {
        let meta = PageMeta::new(PageRequest::default(), 0);
        assert_eq!(meta.pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }
}
