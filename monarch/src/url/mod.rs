//! URL parsing, wrapping the `url` crate rather than hand-rolling a
//! parser — the same reasoning that keeps every other wire format in this
//! workspace behind a dedicated crate instead of a hand-written one.

pub use url::{ParseError, Url};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_and_path() {
        let url = Url::parse("https://example.invalid/events?type=net.http.request").unwrap();
        assert_eq!(url.path(), "/events");
        assert_eq!(url.query(), Some("type=net.http.request"));
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(matches!(
            Url::parse("example.invalid/events"),
            Err(ParseError::RelativeUrlWithoutBase)
        ));
    }
}
