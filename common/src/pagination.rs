// Page-token bookkeeping for paginated listings

use thiserror::Error;

pub const DEFAULT_MAX_PAGES: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("remote repeated page token '{0}'")]
    RepeatedToken(String),

    #[error("listing did not finish within {0} pages")]
    TooManyPages(usize),
}

/// Follows `nextPageToken` until it runs out
///
/// Stops with an error when the remote hands back the token it was just
/// given, or when more than `max_pages` pages would be fetched.
#[derive(Debug)]
pub struct PageCursor {
    token: Option<String>,
    pages: usize,
    max_pages: usize,
}

impl PageCursor {
    pub fn new(max_pages: usize) -> Self {
        Self {
            token: None,
            pages: 0,
            max_pages: max_pages.max(1),
        }
    }

    /// Token to send with the next request; `None` for the first page
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Record a fetched page. `Ok(true)` means another page should be requested.
    pub fn advance(&mut self, next: Option<String>) -> Result<bool, PageError> {
        self.pages += 1;
        let Some(next) = next.filter(|token| !token.is_empty()) else {
            return Ok(false);
        };
        if self.token.as_deref() == Some(next.as_str()) {
            return Err(PageError::RepeatedToken(next));
        }
        if self.pages >= self.max_pages {
            return Err(PageError::TooManyPages(self.max_pages));
        }
        self.token = Some(next);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_stops_without_token() {
        let mut cursor = PageCursor::new(10);
        assert_eq!(cursor.token(), None);
        assert_eq!(cursor.advance(Some("p2".to_string())), Ok(true));
        assert_eq!(cursor.token(), Some("p2"));
        assert_eq!(cursor.advance(Some(String::new())), Ok(false));
    }

    #[test]
    fn test_cursor_rejects_repeated_token() {
        let mut cursor = PageCursor::new(10);
        assert_eq!(cursor.advance(Some("same".to_string())), Ok(true));
        assert_eq!(
            cursor.advance(Some("same".to_string())),
            Err(PageError::RepeatedToken("same".to_string()))
        );
    }

    #[test]
    fn test_cursor_caps_page_count() {
        let mut cursor = PageCursor::new(3);
        assert_eq!(cursor.advance(Some("p2".to_string())), Ok(true));
        assert_eq!(cursor.advance(Some("p3".to_string())), Ok(true));
        assert_eq!(
            cursor.advance(Some("p4".to_string())),
            Err(PageError::TooManyPages(3))
        );
    }

    #[test]
    fn test_last_allowed_page_may_end_the_listing() {
        let mut cursor = PageCursor::new(1);
        assert_eq!(cursor.advance(None), Ok(false));
    }
}
