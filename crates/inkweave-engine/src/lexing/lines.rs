/// A byte range `[start, end)` into the source text.
///
/// Lines are tracked as spans instead of copied strings so that a block comment can be
/// sliced out of the original text across several lines without re-joining them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn slice(self, source: &str) -> &str {
        &source[self.start..self.end]
    }
}

/// Splits `source` into line spans. Each span includes its terminating `\n`; only the
/// final line may lack one.
pub fn line_spans(source: &str) -> Vec<Span> {
    let mut offset = 0usize;
    source
        .split_inclusive('\n')
        .map(|line| {
            let start = offset;
            offset += line.len();
            Span { start, end: offset }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_keep_newlines() {
        let source = "a\nbc\n";
        let spans = line_spans(source);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].slice(source), "a\n");
        assert_eq!(spans[1].slice(source), "bc\n");
    }

    #[test]
    fn final_line_without_newline() {
        let source = "a\nb";
        let spans = line_spans(source);
        assert_eq!(spans[1], Span { start: 2, end: 3 });
        assert_eq!(spans[1].len(), 1);
    }

    #[test]
    fn empty_source_has_no_lines() {
        assert!(line_spans("").is_empty());
    }
}
