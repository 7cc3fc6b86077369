use crate::models::{Block, BlockKind};

use super::classify::LineClass;

#[derive(Debug)]
enum Pending {
    None,
    Code(String),
    Doc {
        indent: String,
        delimiter: String,
        content: String,
    },
}

/// Merges classified lines into [`Block`]s.
///
/// Adjacent code lines merge; adjacent line-comment doc lines merge when indent and
/// delimiter agree. Each block comment is its own block.
pub struct BlockBuilder {
    pending: Pending,
    out: Vec<Block>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self {
            pending: Pending::None,
            out: vec![],
        }
    }

    pub fn push(&mut self, class: LineClass<'_, '_>) {
        match class {
            LineClass::Code { line } => self.extend_code(line),
            LineClass::InlineDoc {
                indent,
                delimiter,
                body,
            } => self.extend_doc(indent, delimiter, body),
            LineClass::BlockDoc {
                indent,
                delimiter,
                mut inner,
                ..
            } => {
                self.flush();
                // The newline after the closing delimiter terminates this block.
                inner.push('\n');
                self.out.push(Block::doc(indent, delimiter, inner));
            }
        }
    }

    pub fn finish(mut self) -> Vec<Block> {
        self.flush();
        migrate_trailing_newlines(&mut self.out);
        self.out
    }

    fn extend_code(&mut self, line: &str) {
        if let Pending::Code(content) = &mut self.pending {
            content.push_str(line);
            return;
        }
        self.flush();
        self.pending = Pending::Code(line.to_string());
    }

    fn extend_doc(&mut self, indent: &str, delimiter: &str, body: &str) {
        // A bare delimiter ending the file stays its own block so de-lexing can
        // restore it.
        if let Pending::Doc {
            indent: pending_indent,
            delimiter: pending_delimiter,
            content,
        } = &mut self.pending
            && pending_indent == indent
            && pending_delimiter == delimiter
            && !body.is_empty()
        {
            content.push_str(body);
            return;
        }
        self.flush();
        self.pending = Pending::Doc {
            indent: indent.to_string(),
            delimiter: delimiter.to_string(),
            content: body.to_string(),
        };
    }

    fn flush(&mut self) {
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::None => {}
            Pending::Code(content) => self.out.push(Block::code(content)),
            Pending::Doc {
                indent,
                delimiter,
                content,
            } => self.out.push(Block {
                indent,
                kind: BlockKind::Doc(delimiter),
                content,
            }),
        }
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops the newline ending every block but the last; de-lexing restores it at the
/// boundary. The last block keeps the file's final newline, if any.
fn migrate_trailing_newlines(blocks: &mut [Block]) {
    let Some((_, leading)) = blocks.split_last_mut() else {
        return;
    };
    for block in leading {
        debug_assert!(block.content.ends_with('\n'));
        if block.content.ends_with('\n') {
            block.content.pop();
        }
    }
}
