pub mod cache;
pub mod classifier;
pub mod error;
pub mod hooks;
pub mod io;
pub mod lexing;
pub mod models;
pub mod processor;
pub mod project;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use cache::{Anchor, AnchorKey, FileCacheEntry, Link, ProjectState, SharedProject};
pub use classifier::{FileKind, classify};
pub use error::{DecodeError, HookError, ProcessError};
pub use io::{FileContents, FsPersistence, MemoryPersistence, PersistError, Persistence};
pub use lexing::{delex, lex};
pub use models::{Block, BlockKind, LanguageProfile, LanguageTable};
pub use processor::{LoadOutcome, LoadRequest, Processor, RenderedPage, SaveOutcome, SaveRequest};
pub use project::Project;
