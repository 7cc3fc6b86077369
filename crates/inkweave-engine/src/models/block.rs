use serde::{Deserialize, Serialize};

/// How a block's content relates to the comment syntax of its language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// Source lines emitted verbatim.
    Code,
    /// Comment lines rendered as rich text; carries the comment opener that prefixes
    /// them. An empty delimiter is valid and means "no prefix" (markup-only files).
    Doc(String),
    /// A doc block whose delimiter has not been chosen yet (e.g. created by an editor).
    /// De-lexing picks the language's preferred doc delimiter.
    Unclassified,
}

/// One code or documentation block of a literate source file.
///
/// Blocks are produced in source order. Every block except the last has the newline
/// that ended its final line removed; de-lexing re-inserts it at the block boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Leading whitespace (spaces only) re-inserted before every doc line.
    pub indent: String,
    pub kind: BlockKind,
    pub content: String,
}

impl Block {
    pub fn code(content: impl Into<String>) -> Self {
        Self {
            indent: String::new(),
            kind: BlockKind::Code,
            content: content.into(),
        }
    }

    pub fn doc(
        indent: impl Into<String>,
        delimiter: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            indent: indent.into(),
            kind: BlockKind::Doc(delimiter.into()),
            content: content.into(),
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self.kind, BlockKind::Code)
    }

    /// True for both classified and unclassified doc blocks.
    pub fn is_doc(&self) -> bool {
        !self.is_code()
    }

    /// The comment delimiter for classified doc blocks.
    pub fn delimiter(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Doc(delimiter) => Some(delimiter),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_block_has_no_delimiter() {
        let block = Block::code("x = 1");
        assert!(block.is_code());
        assert!(!block.is_doc());
        assert_eq!(block.delimiter(), None);
        assert_eq!(block.indent, "");
    }

    #[test]
    fn empty_delimiter_is_still_a_doc_block() {
        let block = Block::doc("", "", "# Title\n");
        assert!(block.is_doc());
        assert_eq!(block.delimiter(), Some(""));
    }

    #[test]
    fn unclassified_is_doc_without_delimiter() {
        let block = Block {
            indent: "  ".to_string(),
            kind: BlockKind::Unclassified,
            content: " new".to_string(),
        };
        assert!(block.is_doc());
        assert_eq!(block.delimiter(), None);
    }
}
