//! # Block Lexing
//!
//! Splits literate source into alternating code and doc [`Block`]s and back again.
//!
//! ## Phases
//!
//! 1. **Line classification** (`classify`): each line is tested against the profile's
//!    comment delimiters; a block comment may claim several lines at once.
//! 2. **Block construction** (`builder`): classified lines merge into blocks, then the
//!    newline ending each non-final block is dropped (trailing newline migration).
//! 3. **De-lexing** (`delex`): delimiters and indents are re-inserted line by line and
//!    the migrated newlines restored at block boundaries.
//!
//! ## Key Invariants
//!
//! - `delex(lex(t, p), p) == t` for every text `t`
//! - `lex(delex(b, p), p) == b` for every `b` produced by `lex`
//! - Regions that could not be restored byte-exactly (nested or ragged block
//!   comments) are classified as code

pub mod builder;
pub mod classify;
pub mod delex;
pub mod lines;

pub use builder::BlockBuilder;
pub use classify::{CommentLineClassifier, LineClass};
pub use delex::delex;
pub use lines::{Span, line_spans};

use crate::models::{Block, LanguageProfile};

/// Splits `text` into code and doc blocks using `profile`'s comment delimiters.
///
/// A profile without any delimiters yields the whole text as a single code block.
pub fn lex(text: &str, profile: &LanguageProfile) -> Vec<Block> {
    if text.is_empty() {
        return Vec::new();
    }
    if !profile.has_comment_delimiters() {
        log::debug!("{} has no comment delimiters; single code block", profile.name);
        return vec![Block::code(text)];
    }

    let lines = line_spans(text);
    let classifier = CommentLineClassifier::new(profile);
    let mut builder = BlockBuilder::new();

    let mut index = 0;
    while index < lines.len() {
        let class = classifier.classify(text, &lines, index);
        index += class.line_count();
        builder.push(class);
    }

    builder.finish()
}
