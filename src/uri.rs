//! Internal URI helpers shared by the identifier engine, the local loader
//! and the resolver.
//!
//! Identifier records expose URIs as plain strings; this module confines
//! the `url` crate to the two operations the algorithms need: resolving a
//! reference against an optional base, and splitting off a fragment.

use url::Url;

/// Resolves `reference` against `base` per RFC 3986.
///
/// An absolute reference wins outright. A relative reference is joined to
/// the base when one exists and is absolute; otherwise the reference is
/// returned as-is (documents without an absolute base keep relative
/// identifiers verbatim).
pub(crate) fn resolve_uri(base: Option<&str>, reference: &str) -> String {
    if let Ok(url) = Url::parse(reference) {
        return url.to_string();
    }

    if let Some(base) = base {
        if let Ok(base_url) = Url::parse(base) {
            if let Ok(joined) = base_url.join(reference) {
                return joined.to_string();
            }
        }
    }

    reference.to_string()
}

/// Splits a URI at its first `#`. The fragment does not include the `#`.
pub(crate) fn split_fragment(uri: &str) -> (&str, Option<&str>) {
    match uri.find('#') {
        Some(i) => (&uri[..i], Some(&uri[i + 1..])),
        None => (uri, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_reference_wins() {
        assert_eq!(
            resolve_uri(
                Some("https://example.com/root.json"),
                "https://other.tld/s.json"
            ),
            "https://other.tld/s.json"
        );
        assert_eq!(
            resolve_uri(None, "urn:uuid:ee564b8a-7a87-4125-8c96-e9f123d6766f"),
            "urn:uuid:ee564b8a-7a87-4125-8c96-e9f123d6766f"
        );
    }

    #[test]
    fn relative_reference_joins_base() {
        let base = Some("https://example.com/root.json");
        assert_eq!(
            resolve_uri(base, "other.json"),
            "https://example.com/other.json"
        );
        assert_eq!(
            resolve_uri(base, "t/inner.json"),
            "https://example.com/t/inner.json"
        );
        assert_eq!(
            resolve_uri(base, "/schema.json#/$defs/C"),
            "https://example.com/schema.json#/$defs/C"
        );
        assert_eq!(
            resolve_uri(base, "#bar"),
            "https://example.com/root.json#bar"
        );
    }

    #[test]
    fn missing_base_keeps_reference_verbatim() {
        assert_eq!(resolve_uri(None, "other.json"), "other.json");
        assert_eq!(resolve_uri(None, "#foo"), "#foo");
        assert_eq!(resolve_uri(Some("not a base"), "x.json"), "x.json");
    }

    #[test]
    fn fragment_splitting() {
        assert_eq!(
            split_fragment("https://example.com/a.json#/x/y"),
            ("https://example.com/a.json", Some("/x/y"))
        );
        assert_eq!(
            split_fragment("https://example.com/a.json"),
            ("https://example.com/a.json", None)
        );
        assert_eq!(split_fragment("#bar"), ("", Some("bar")));
        assert_eq!(split_fragment("a#"), ("a", Some("")));
    }
}
