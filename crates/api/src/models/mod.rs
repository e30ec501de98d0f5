//! Domain models and request payloads for the API.
//!
//! Models are validated domain objects returned by repositories. The
//! `*Input` types are deserialized request bodies; each exposes a
//! `validate` method that normalizes it or returns a `DomainError`.

pub mod client;
pub mod employee;
pub mod operation;
pub mod property;
pub mod report;
pub mod user;
pub mod visit;

use serde::{Deserialize, Serialize};

use estate_desk_core::DomainError;

use crate::db::limit_offset;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// `page` / `page_size` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageParams {
    /// Normalized page number (at least 1).
    #[must_use]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// `(limit, offset)` for SQL.
    #[must_use]
    pub fn limit_offset(&self) -> (i64, i64) {
        limit_offset(self.page(), self.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Wrap a fetched page.
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        let (page_size, _) = params.limit_offset();
        let total_pages = if total == 0 {
            0
        } else {
            (total + page_size - 1) / page_size
        };
        Self {
            items,
            total,
            page: params.page(),
            page_size,
            total_pages,
        }
    }

    /// Convert the items, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

/// Trim `value` and reject it when empty or longer than `max` characters.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::invalid(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field, turning blanks into `None`.
pub(crate) fn optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, DomainError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v, max).map(Some),
    }
}

/// Accept only absolute http(s) URLs.
pub(crate) fn http_url(field: &str, value: &str) -> Result<String, DomainError> {
    let url = required_text(field, value, 2048)?;
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') && !url.contains(char::is_whitespace) => {
            Ok(url)
        }
        _ => Err(DomainError::invalid(format!(
            "{field} must be an absolute http(s) URL"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_metadata() {
        let params = PageParams {
            page: Some(2),
            page_size: Some(20),
        };
        let page = Page::new(vec![1, 2, 3], 43, params);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 20);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_page_defaults_and_fallbacks() {
        let page: Page<i32> = Page::new(vec![], 0, PageParams::default());
        assert_eq!((page.page, page.page_size, page.total_pages), (1, 10, 0));

        let params = PageParams {
            page: Some(-4),
            page_size: Some(500),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit_offset(), (10, 0));
    }

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("title", "  Casa  ", 10).unwrap(), "Casa");
        assert!(required_text("title", "   ", 10).is_err());
        assert!(required_text("title", "abcdefghijk", 10).is_err());
        assert_eq!(optional_text("zone", Some(" "), 10).unwrap(), None);
    }

    #[test]
    fn test_http_url() {
        assert!(http_url("url", "https://bucket.example.com/a.jpg").is_ok());
        assert!(http_url("url", "ftp://bucket/a.jpg").is_err());
        assert!(http_url("url", "https://").is_err());
        assert!(http_url("url", "https://a b.com").is_err());
    }
}
