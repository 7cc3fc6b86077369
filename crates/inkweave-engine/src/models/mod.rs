pub mod block;
pub mod language;

pub use block::{Block, BlockKind};
pub use language::{BlockDelimiters, LanguageProfile, LanguageTable, MarkupDialect, ProfileKind};
