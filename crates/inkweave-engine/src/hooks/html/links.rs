use regex::Regex;
use relative_path::{RelativePath, RelativePathBuf};
use std::sync::OnceLock;

use crate::cache::AnchorKey;

/// Resolves an `href` found in `from` to a project anchor.
///
/// Paths are relative to the directory of `from`; a bare `#id` points into `from`
/// itself. External URLs (anything with a scheme, protocol-relative or rooted paths)
/// are not project anchors.
pub fn resolve_href(from: &RelativePath, href: &str) -> Option<AnchorKey> {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    let scheme =
        SCHEME.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("Invalid scheme regex"));

    let href = href.trim();
    if href.is_empty() || href.starts_with('/') || scheme.is_match(href) {
        return None;
    }

    let (path, fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, fragment),
        None => (href, ""),
    };
    let path = path.split('?').next().unwrap_or_default();

    let file: RelativePathBuf = if path.is_empty() {
        from.to_relative_path_buf()
    } else {
        from.parent()
            .unwrap_or_else(|| RelativePath::new(""))
            .join_normalized(path)
    };
    if file.as_str().is_empty() || file.as_str().starts_with("..") {
        return None;
    }

    Some(AnchorKey::new(file, fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("docs/a.md", "b.md", Some(("docs/b.md", "")))]
    #[case("docs/a.md", "b.md#setup", Some(("docs/b.md", "setup")))]
    #[case("docs/a.md", "#local", Some(("docs/a.md", "local")))]
    #[case("docs/a.md", "../src/lib.rs#api", Some(("src/lib.rs", "api")))]
    #[case("a.md", "./b.py?raw=1#x", Some(("b.py", "x")))]
    #[case("a.md", "https://example.com/a.md", None)]
    #[case("a.md", "mailto:me@example.com", None)]
    #[case("a.md", "//cdn.example.com/x.js", None)]
    #[case("a.md", "/absolute.md", None)]
    #[case("a.md", "../outside.md", None)]
    #[case("a.md", "", None)]
    fn resolves_project_relative_hrefs(
        #[case] from: &str,
        #[case] href: &str,
        #[case] expected: Option<(&str, &str)>,
    ) {
        let expected = expected.map(|(file, id)| AnchorKey::new(file, id));
        assert_eq!(resolve_href(RelativePath::new(from), href), expected);
    }
}
