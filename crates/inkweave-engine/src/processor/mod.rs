//! # Page Processor
//!
//! Orchestrates classifier, lexer, hook pipeline and cache for one file at a time.
//!
//! ## Load
//!
//! classify → pre-parse hooks (skipped while the cache entry is fresh) → lex →
//! post-parse hooks → HTML cache hooks (only when stale) → cross-reference hooks →
//! commit the cache update → navigation.
//!
//! ## Save
//!
//! HTML cache hooks → cross-reference hooks → post-parse hooks reversed → de-lex →
//! pre-parse hooks reversed → re-lex check → commit. A dirty save carries the reload
//! of what will be persisted.
//!
//! The processor performs no I/O. Every public operation holds the path's critical
//! section of the [`SharedProject`]; a failed run leaves the cache untouched.

mod load;
mod save;

use relative_path::{RelativePath, RelativePathBuf};
use std::time::SystemTime;

use crate::cache::{NavLinks, SharedProject};
use crate::error::{DecodeError, ProcessError};
use crate::hooks::{HookContext, HookPipeline};
use crate::io::FileContents;
use crate::lexing::lex;
use crate::models::{Block, LanguageProfile, LanguageTable};

/// What the caller read for a file.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub path: RelativePathBuf,
    /// The bytes, or the reason they could not be read.
    pub contents: Result<FileContents, String>,
    /// Set for the project's table-of-contents root.
    pub is_toc: bool,
}

/// A rendered literate file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub blocks: Vec<Block>,
    pub nav: NavLinks,
    /// The rendering differs from what is on disk (ids inserted, references retitled,
    /// pre-parse hooks changed the text).
    pub dirty: bool,
    /// The cache hooks ran because the file's entry was stale.
    pub cache_refreshed: bool,
    /// Heading levels that carry numbers; the presentation layer mirrors this.
    pub numbering_depth: usize,
    /// This file's number in the table of contents.
    pub toc_number: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Binary {
        bytes: Vec<u8>,
        decode_error: Option<DecodeError>,
    },
    PlainText(String),
    Rendered(RenderedPage),
    Failed(ProcessError),
}

impl LoadOutcome {
    pub fn rendered(&self) -> Option<&RenderedPage> {
        match self {
            LoadOutcome::Rendered(page) => Some(page),
            _ => None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.rendered().is_some_and(|page| page.dirty)
    }
}

/// Blocks submitted by an editing session.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub path: RelativePathBuf,
    pub blocks: Vec<Block>,
    pub is_toc: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    /// Text to hand to persistence.
    pub persist_text: String,
    /// Some stage changed the submitted content; the client must take `reload`.
    pub dirty: bool,
    /// The submitted blocks after the HTML stage.
    pub blocks: Vec<Block>,
    /// The load-direction rendering of `persist_text`, present when `dirty`.
    pub reload: Option<Box<LoadOutcome>>,
}

/// Stateless driver of the load and save directions.
#[derive(Debug, Clone)]
pub struct Processor {
    languages: LanguageTable,
    hooks: HookPipeline,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new(LanguageTable::builtin(), HookPipeline::default())
    }
}

impl Processor {
    pub fn new(languages: LanguageTable, hooks: HookPipeline) -> Self {
        Self { languages, hooks }
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }

    pub fn hooks(&self) -> &HookPipeline {
        &self.hooks
    }

    pub fn load(&self, shared: &SharedProject, request: LoadRequest) -> LoadOutcome {
        let path = request.path.clone();
        shared.with_section(&path, || self.load_unlocked(shared, request))
    }

    pub fn save(
        &self,
        shared: &SharedProject,
        request: SaveRequest,
    ) -> Result<SaveOutcome, ProcessError> {
        let path = request.path.clone();
        shared.with_section(&path, || self.save_unlocked(shared, request))
    }

    /// The profile a file is processed with: the TOC root is always markup in project
    /// mode, everything else goes by extension.
    fn profile_for(
        &self,
        path: &RelativePath,
        is_toc: bool,
        is_project: bool,
    ) -> Option<&LanguageProfile> {
        if is_toc && is_project {
            self.languages.document_profile()
        } else {
            self.languages.for_path(path)
        }
    }

    /// Text to blocks: lexing for source files, a single doc block for markup.
    fn parse(&self, text: &str, ctx: &HookContext<'_>) -> Result<Vec<Block>, ProcessError> {
        let blocks = if ctx.profile.is_document() {
            vec![Block::doc("", "", text)]
        } else {
            lex(text, ctx.profile)
        };
        Ok(self.hooks.post_forward(blocks, ctx)?)
    }
}

/// Cache stamp for an update computed now from contents modified at `modified`.
fn stamp_after(modified: SystemTime) -> SystemTime {
    SystemTime::now().max(modified)
}
