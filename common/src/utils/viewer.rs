use serde::Serialize;

/// Ephemeral page position within a rendered document. Never persisted; the
/// page count is derived from the binary each time a viewer opens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    page: u32,
    page_count: u32,
}

impl PageCursor {
    /// Starts on page 1. A document reporting zero pages is treated as one
    /// page so the cursor always points at something renderable.
    pub fn new(page_count: u32) -> Self {
        Self {
            page: 1,
            page_count: page_count.max(1),
        }
    }

    /// Opens directly on `page`, clamped to `[1, page_count]`.
    pub fn at(page_count: u32, page: u32) -> Self {
        let mut cursor = Self::new(page_count);
        cursor.go_to(page);
        cursor
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn go_to(&mut self, page: u32) -> u32 {
        self.page = page.clamp(1, self.page_count);
        self.page
    }

    pub fn next(&mut self) -> u32 {
        self.go_to(self.page.saturating_add(1))
    }

    pub fn previous(&mut self) -> u32 {
        self.go_to(self.page.saturating_sub(1))
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_starts_on_first_page() {
        let cursor = PageCursor::new(5);
        assert_eq!(cursor.page(), 1);
        assert_eq!(cursor.page_count(), 5);
        assert!(!cursor.has_previous());
        assert!(cursor.has_next());
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut cursor = PageCursor::new(3);
        assert_eq!(cursor.previous(), 1);
        assert_eq!(cursor.next(), 2);
        assert_eq!(cursor.next(), 3);
        assert_eq!(cursor.next(), 3);
        assert!(!cursor.has_next());
    }

    #[test]
    fn go_to_clamps_out_of_range_pages() {
        assert_eq!(PageCursor::at(4, 0).page(), 1);
        assert_eq!(PageCursor::at(4, 9).page(), 4);
        assert_eq!(PageCursor::at(4, 2).page(), 2);
    }

    #[test]
    fn empty_document_still_has_one_page() {
        let mut cursor = PageCursor::new(0);
        assert_eq!(cursor.page_count(), 1);
        assert_eq!(cursor.next(), 1);
    }
}
