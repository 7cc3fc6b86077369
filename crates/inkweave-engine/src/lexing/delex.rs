use crate::models::{Block, BlockKind, LanguageProfile};

/// Rebuilds source text from blocks; the exact inverse of [`lex`](super::lex).
pub fn delex(blocks: &[Block], profile: &LanguageProfile) -> String {
    let mut out = String::new();
    let last = blocks.len().saturating_sub(1);

    for (i, block) in blocks.iter().enumerate() {
        let mut full = block.content.clone();
        if i != last {
            full.push('\n');
        }

        let delimiter = match &block.kind {
            BlockKind::Code => None,
            BlockKind::Doc(delimiter) => Some(delimiter.as_str()),
            BlockKind::Unclassified => {
                let preferred = profile.preferred_doc_delimiter();
                if preferred.is_none() {
                    log::warn!(
                        "{} has no doc delimiter; writing unclassified block as code",
                        profile.name
                    );
                }
                preferred
            }
        };

        match delimiter {
            None => out.push_str(&full),
            Some(open) => match profile.block_close_for(open) {
                Some(close) => write_block_comment(&mut out, &block.indent, open, close, &full),
                None => write_line_comments(&mut out, &block.indent, open, &full),
            },
        }
    }

    out
}

fn write_line_comments(out: &mut String, indent: &str, delimiter: &str, full: &str) {
    if full.is_empty() {
        out.push_str(indent);
        out.push_str(delimiter);
        return;
    }
    for line in full.split_inclusive('\n') {
        out.push_str(indent);
        out.push_str(delimiter);
        out.push_str(line);
    }
}

fn write_block_comment(out: &mut String, indent: &str, open: &str, close: &str, full: &str) {
    let inner = full.strip_suffix('\n').unwrap_or(full);
    out.push_str(indent);
    out.push_str(open);
    out.push_str(&reindent(inner, indent));
    out.push_str(close);
    out.push('\n');
}

/// Puts the indent back on continuation lines; empty middle lines stay empty and the
/// closing line always receives it.
fn reindent(inner: &str, indent: &str) -> String {
    let segments: Vec<&str> = inner.split('\n').collect();
    let last = segments.len() - 1;
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if i == 0 || (segment.is_empty() && i != last) {
                segment.to_string()
            } else {
                format!("{indent}{segment}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
