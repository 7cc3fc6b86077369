use crate::models::LanguageProfile;

use super::lines::Span;

/// Classification of the line (or block comment) starting at one line index.
///
/// This is the first lexing phase: lines are classified from local facts only, and
/// the [`BlockBuilder`](super::builder::BlockBuilder) decides how they merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass<'t, 'p> {
    /// A plain source line, newline included.
    Code { line: &'t str },
    /// A line comment that opens a doc line. `body` is everything after the
    /// delimiter, including the separating space and the newline.
    InlineDoc {
        indent: &'t str,
        delimiter: &'p str,
        body: &'t str,
    },
    /// A block comment spanning `lines` lines. `inner` is the text between the
    /// delimiters with the indent removed from continuation lines.
    BlockDoc {
        indent: &'t str,
        delimiter: &'p str,
        inner: String,
        lines: usize,
    },
}

impl LineClass<'_, '_> {
    /// How many source lines this classification consumed.
    pub fn line_count(&self) -> usize {
        match self {
            LineClass::BlockDoc { lines, .. } => *lines,
            _ => 1,
        }
    }
}

#[derive(Debug)]
struct Candidate<'p> {
    open: &'p str,
    close: Option<&'p str>,
}

/// Recognises doc-block comments using one language profile's delimiters.
pub struct CommentLineClassifier<'p> {
    /// Longest delimiter first, so `--[[` wins over `--`.
    candidates: Vec<Candidate<'p>>,
}

impl<'p> CommentLineClassifier<'p> {
    pub fn new(profile: &'p LanguageProfile) -> Self {
        let mut candidates: Vec<Candidate<'p>> = profile
            .inline_comments
            .iter()
            .map(|open| Candidate { open, close: None })
            .chain(profile.block_comments.iter().map(|b| Candidate {
                open: &b.open,
                close: Some(&b.close),
            }))
            .filter(|c| !c.open.is_empty())
            .collect();
        candidates.sort_by(|a, b| b.open.len().cmp(&a.open.len()));
        Self { candidates }
    }

    pub fn classify<'t>(
        &self,
        source: &'t str,
        lines: &[Span],
        index: usize,
    ) -> LineClass<'t, 'p> {
        let line = lines[index].slice(source);
        let indent_len = line.len() - line.trim_start_matches(' ').len();
        let (indent, rest) = line.split_at(indent_len);

        for candidate in &self.candidates {
            let Some(after) = rest.strip_prefix(candidate.open) else {
                continue;
            };
            if !opens_doc(after) {
                continue;
            }
            match candidate.close {
                None => {
                    return LineClass::InlineDoc {
                        indent,
                        delimiter: candidate.open,
                        body: after,
                    };
                }
                Some(close) => {
                    if let Some(class) =
                        block_comment(source, lines, index, indent, candidate.open, close)
                    {
                        return class;
                    }
                }
            }
        }

        LineClass::Code { line }
    }
}

/// A delimiter opens a doc line only when followed by a space, newline or EOF.
fn opens_doc(after: &str) -> bool {
    after.is_empty() || after.starts_with(' ') || after.starts_with('\n')
}

fn block_comment<'t, 'p>(
    source: &'t str,
    lines: &[Span],
    index: usize,
    indent: &'t str,
    open: &'p str,
    close: &'p str,
) -> Option<LineClass<'t, 'p>> {
    let open_end = lines[index].start + indent.len() + open.len();
    let tail = &source[open_end..];
    let close_offset = tail.find(close)?;
    let inner = &tail[..close_offset];

    // Nested openers are left as code rather than guessed at.
    if inner.contains(open) {
        log::debug!("nested `{open}` inside block comment at line {index}; keeping as code");
        return None;
    }

    let close_end = open_end + close_offset + close.len();
    if !source[close_end..].starts_with('\n') {
        return None;
    }
    let last = index + lines[index..].iter().position(|s| s.end == close_end + 1)?;
    let inner = strip_continuation_indent(inner, indent)?;

    Some(LineClass::BlockDoc {
        indent,
        delimiter: open,
        inner,
        lines: last - index + 1,
    })
}

/// Removes `indent` from every continuation line of a block comment.
///
/// Returns `None` when a line could not be restored exactly by de-lexing: a middle
/// line that lacks the indent or holds only the indent, or a closing line without it.
fn strip_continuation_indent(inner: &str, indent: &str) -> Option<String> {
    let segments: Vec<&str> = inner.split('\n').collect();
    let last = segments.len() - 1;
    let mut out = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        if i == 0 {
            out.push(*segment);
        } else if i == last {
            out.push(segment.strip_prefix(indent)?);
        } else if segment.is_empty() {
            out.push("");
        } else {
            let stripped = segment.strip_prefix(indent)?;
            if stripped.is_empty() {
                return None;
            }
            out.push(stripped);
        }
    }

    Some(out.join("\n"))
}
