//! Pagination window over an in-memory collection
//!
//! Out-of-range requests fail closed: they yield an empty page that still
//! reports the size of the whole source, so callers can tell "past the end"
//! from "nothing there".

use serde::{Deserialize, Serialize};

/// A request for `length` items starting at `offset`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: i64,
    pub length: i64,
}

impl PageRequest {
    pub const fn new(offset: i64, length: i64) -> Self {
        Self { offset, length }
    }

    /// Request for page `index` (zero-based) of `page_size` items
    pub const fn page(index: i64, page_size: i64) -> Self {
        Self {
            offset: index.saturating_mul(page_size),
            length: page_size,
        }
    }

    /// Request for the page following this one
    pub const fn next(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.length),
            length: self.length,
        }
    }
}

/// A bounded slice of a source plus the size of the whole source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

impl<T> Page<T> {
    pub fn empty(total_count: usize) -> Self {
        Self {
            items: Vec::new(),
            total_count,
        }
    }

    /// Whether items exist past this page, given where it started
    pub fn has_more_after(&self, offset: i64) -> bool {
        offset >= 0 && (offset as usize).saturating_add(self.items.len()) < self.total_count
    }
}

/// Slice `source[start, min(start + length, len))`
///
/// Returns an empty page when `start < 0`, `length <= 0` or `start >= len`.
pub fn paginate<T: Clone>(source: &[T], start: i64, length: i64) -> Page<T> {
    let total_count = source.len();
    if start < 0 || length <= 0 || start as u64 >= total_count as u64 {
        return Page::empty(total_count);
    }

    let start = start as usize;
    let end = start.saturating_add(length as usize).min(total_count);
    Page {
        items: source[start..end].to_vec(),
        total_count,
    }
}

/// A collaborator that serves pages of `T`
pub trait PageSource<T> {
    fn page(&self, request: PageRequest) -> Page<T>;
}

impl<T: Clone> PageSource<T> for [T] {
    fn page(&self, request: PageRequest) -> Page<T> {
        paginate(self, request.offset, request.length)
    }
}

impl<T: Clone> PageSource<T> for Vec<T> {
    fn page(&self, request: PageRequest) -> Page<T> {
        paginate(self, request.offset, request.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hundred() -> Vec<i32> {
        (1..=100).collect()
    }

    #[test]
    fn test_first_page() {
        let page = paginate(&hundred(), 0, 20);
        assert_eq!(page.items, (1..=20).collect::<Vec<_>>());
        assert_eq!(page.total_count, 100);
    }

    #[test]
    fn test_partial_last_page() {
        let page = paginate(&hundred(), 95, 20);
        assert_eq!(page.items, (96..=100).collect::<Vec<_>>());
        assert_eq!(page.total_count, 100);
        assert!(!page.has_more_after(95));
    }

    #[test]
    fn test_empty_source() {
        let empty: Vec<i32> = Vec::new();
        let page = paginate(&empty, 0, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_invalid_bounds_fail_closed() {
        let data = hundred();
        for (start, length) in [(-1, 10), (0, 0), (0, -5), (100, 10), (250, 1)] {
            let page = paginate(&data, start, length);
            assert!(page.items.is_empty(), "start={start} length={length}");
            assert_eq!(page.total_count, 100);
        }
    }

    #[test]
    fn test_huge_length_is_clamped() {
        let page = paginate(&hundred(), 90, i64::MAX);
        assert_eq!(page.items.len(), 10);
    }

    #[test]
    fn test_extreme_requests_saturate() {
        let far = PageRequest::page(i64::MAX / 2, 20);
        assert_eq!(far.offset, i64::MAX);
        assert_eq!(far.next().offset, i64::MAX);
        assert_eq!(PageRequest::new(10, i64::MAX).next().offset, i64::MAX);
        assert!(hundred().page(far.next()).items.is_empty());
    }

    #[test]
    fn test_page_source_walks_pages() {
        let data = hundred();
        let mut request = PageRequest::page(0, 30);
        let mut seen = Vec::new();
        loop {
            let page = data.page(request);
            if page.items.is_empty() {
                break;
            }
            let more = page.has_more_after(request.offset);
            seen.extend(page.items);
            if !more {
                break;
            }
            request = request.next();
        }
        assert_eq!(seen, data);
    }

    #[test]
    fn test_page_json_shape() {
        let page = paginate(&["ada", "grace", "linus"], 1, 1);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json, serde_json::json!({ "items": ["grace"], "total_count": 3 }));
    }
}
