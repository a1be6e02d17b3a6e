//! Text and URL cleanup helpers.

use url::Url;

/// Collapses runs of whitespace (including non-breaking spaces) into single spaces.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves an `href`/`src` value against a site origin.
///
/// Returns `None` for values that cannot name a web page (`javascript:`,
/// `mailto:`, fragments, empty strings) and when `origin` is not a URL.
#[must_use]
pub fn resolve_url(origin: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let base = Url::parse(origin).ok()?;
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://scholar.google.com";

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Ada \n\t Lovelace\u{a0}Jr "), "Ada Lovelace Jr");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_resolve_relative_paths() {
        assert_eq!(
            resolve_url(ORIGIN, "/citations?user=abc"),
            Some("https://scholar.google.com/citations?user=abc".to_string())
        );
        assert_eq!(
            resolve_url("https://scholar.google.com/", "citations?user=abc"),
            Some("https://scholar.google.com/citations?user=abc".to_string())
        );
        assert_eq!(
            resolve_url(ORIGIN, "//lh3.googleusercontent.com/a.jpg"),
            Some("https://lh3.googleusercontent.com/a.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_follows_reference_rules() {
        assert_eq!(
            resolve_url(ORIGIN, "../citations/../x?user=a"),
            Some("https://scholar.google.com/x?user=a".to_string())
        );
        assert_eq!(
            resolve_url("http://scholar.local", "//cdn.local/a.png"),
            Some("http://cdn.local/a.png".to_string())
        );
        assert_eq!(resolve_url("not a url", "/citations?user=a"), None);
    }

    #[test]
    fn test_resolve_keeps_absolute() {
        assert_eq!(
            resolve_url(ORIGIN, "https://other.org/x"),
            Some("https://other.org/x".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_non_links() {
        assert_eq!(resolve_url(ORIGIN, ""), None);
        assert_eq!(resolve_url(ORIGIN, "#top"), None);
        assert_eq!(resolve_url(ORIGIN, "javascript:void(0)"), None);
        assert_eq!(resolve_url(ORIGIN, "mailto:a@b.c"), None);
        assert_eq!(resolve_url(ORIGIN, "data:image/png;base64,AAAA"), None);
    }
}
