//! Client-side pagination over an in-memory list

use serde::{Deserialize, Serialize};

/// Fixed page size of the library view.
pub const ITEMS_PER_PAGE: u32 = 12;

/// Most page buttons shown at once.
pub const MAX_PAGE_BUTTONS: u32 = 5;

/// Which slice of a list to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number, 1-based
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl PageRequest {
    /// Create a new page request. Page 0 is treated as page 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_library::pagination::PageRequest;
    ///
    /// let request = PageRequest::new(2, 12);
    /// assert_eq!(request.offset(), 12);
    /// ```
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size,
        }
    }

    /// Index of the first item on this page
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: ITEMS_PER_PAGE,
        }
    }
}

/// One page of a list plus the numbers needed to render a pager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    /// Current page number, 1-based
    pub page: u32,
    /// Total number of pages
    pub total_pages: u32,
    /// Number of items per page
    pub page_size: u32,
}

/// `ceil(total / page_size)`, zero for an empty list.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

impl<T> Page<T> {
    /// Cut `request`'s page out of `all`.
    ///
    /// A page past the end yields no items; the page number is kept as asked.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_library::pagination::{Page, PageRequest};
    ///
    /// let page = Page::paginate((1..=13).collect::<Vec<_>>(), PageRequest::new(2, 12));
    /// assert_eq!(page.items, vec![13]);
    /// assert_eq!(page.total_pages, 2);
    /// ```
    pub fn paginate(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.page_size as usize)
            .collect();

        Self {
            items,
            total,
            page: request.page,
            total_pages: total_pages(total, request.page_size),
            page_size: request.page_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if there are more pages after the current one
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Check if there are pages before the current one
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// 1-based inclusive range of the items shown, for "Showing 13-24 of 30".
    pub fn item_range(&self) -> Option<(u64, u64)> {
        if self.items.is_empty() {
            return None;
        }
        let first = u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size) + 1;
        Some((first, first + self.items.len() as u64 - 1))
    }

    /// Page numbers for the pager: at most `max_buttons`, centred on the
    /// current page where possible.
    pub fn page_window(&self, max_buttons: u32) -> Vec<u32> {
        let total = self.total_pages;
        if total == 0 || max_buttons == 0 {
            return Vec::new();
        }
        if total <= max_buttons {
            return (1..=total).collect();
        }

        let half = max_buttons / 2;
        let current = self.page.clamp(1, total);
        let start = if current <= half + 1 {
            1
        } else if current + half >= total {
            total - max_buttons + 1
        } else {
            current - half
        };
        (start..start + max_buttons).collect()
    }

    /// Map the items to a different type
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
            page_size: self.page_size,
        }
    }
}
