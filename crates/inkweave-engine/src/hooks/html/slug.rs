use std::collections::HashSet;

/// Converts element text to a URL-safe id: lowercase ASCII alphanumerics joined by
/// single hyphens.
pub fn slugify(text: &str) -> String {
    text.chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c.is_whitespace() || c == '-' || c == '_' {
                Some('-')
            } else {
                None
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Hands out ids unique within one file.
#[derive(Debug, Default)]
pub struct IdAllocator {
    taken: HashSet<String>,
}

impl IdAllocator {
    /// Ids already present in the file; never handed out again.
    pub fn with_taken(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            taken: ids.into_iter().collect(),
        }
    }

    /// A fresh id based on `text`, falling back to `fallback` when the text has no
    /// usable characters. Collisions get `-2`, `-3`, ... suffixes.
    pub fn allocate(&mut self, text: &str, fallback: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = fallback.to_string();
        }
        let mut candidate = base.clone();
        let mut n = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Hello World", "hello-world")]
    #[case("Hello, World!", "hello-world")]
    #[case("  Multiple   Spaces  ", "multiple-spaces")]
    #[case("snake_case and-dash", "snake-case-and-dash")]
    #[case("Ünïcode only", "ncode-only")]
    #[case("!!!", "")]
    fn slugify_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn allocator_dedups_within_file() {
        let mut ids = IdAllocator::with_taken(["intro".to_string()]);
        assert_eq!(ids.allocate("Intro", "section"), "intro-2");
        assert_eq!(ids.allocate("Intro", "section"), "intro-3");
        assert_eq!(ids.allocate("???", "figure"), "figure");
        assert_eq!(ids.allocate("", "figure"), "figure-2");
    }
}
