use serde::{Deserialize, Serialize};

pub const PER_PAGE: i64 = 5;

/// `?page=` query. Missing or non-numeric values mean page 1.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn number(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
            .max(1)
    }
}

/// One 1-indexed slice of an ordered result set. A page past the end is empty.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, per_page: i64, total: i64) -> Self {
        let pages = if total == 0 { 0 } else { (total + per_page - 1) / per_page };
        Self {
            items,
            page,
            per_page,
            total,
            pages,
            has_prev: page > 1,
            has_next: page < pages,
        }
    }

    /// Rows to skip before `page`. Saturates so any page number is safe.
    pub fn offset(page: i64, per_page: i64) -> i64 {
        page.max(1).saturating_sub(1).saturating_mul(per_page)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            pages: self.pages,
            has_prev: self.has_prev,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_defaults_and_clamps() {
        assert_eq!(PageQuery { page: None }.number(), 1);
        assert_eq!(PageQuery { page: Some("abc".into()) }.number(), 1);
        assert_eq!(PageQuery { page: Some("0".into()) }.number(), 1);
        assert_eq!(PageQuery { page: Some("-3".into()) }.number(), 1);
        assert_eq!(PageQuery { page: Some("3".into()) }.number(), 3);
    }

    #[test]
    fn page_counts() {
        let p: Page<()> = Page::new(vec![(), ()], 3, 5, 12);
        assert_eq!(p.pages, 3);
        assert!(p.has_prev);
        assert!(!p.has_next);

        let empty: Page<()> = Page::new(vec![], 1, 5, 0);
        assert_eq!(empty.pages, 0);
        assert!(!empty.has_next);
        assert_eq!(Page::<()>::offset(3, 5), 10);
    }

    #[test]
    fn offset_saturates_on_huge_pages() {
        assert_eq!(Page::<()>::offset(i64::MAX, 5), i64::MAX);
        assert_eq!(Page::<()>::offset(i64::MIN, 5), 0);

        let p: Page<()> = Page::new(vec![], i64::MAX, 5, 12);
        assert!(p.has_prev);
        assert!(!p.has_next);
    }
}
