//! # Hook Pipeline
//!
//! Pluggable stages around the lexer:
//!
//! - **pre-parse** ([`PreParseHook`]): raw text, before lexing on load and after
//!   de-lexing on save (in reverse order)
//! - **post-parse** ([`PostParseHook`]): the block sequence, after lexing on load and
//!   before de-lexing on save (in reverse order)
//! - **HTML stage** ([`HtmlHook`]): the rendered doc-block tree, visited once per role
//!   with every element dispatched to the hooks interested in its tag
//!
//! Hooks are a closed set of variants; `Custom` variants carry plain function pointers
//! for transforms this crate does not ship.

pub mod html;
pub mod markdown;
pub mod scan;
pub mod text;
pub mod xref;

pub use html::{DocFragments, HtmlFragment, HtmlHook, HtmlRole, HtmlVisitor, TagDispatch};
pub use markdown::{BlockTransform, PostParseHook, markdown_to_html};
pub use scan::CacheScan;
pub use text::{PreParseHook, TextTransform};
pub use xref::CrossReferences;

use relative_path::RelativePath;

use crate::error::HookError;
use crate::models::{Block, LanguageProfile};

/// What a hook may know about the file it is transforming.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub path: &'a RelativePath,
    pub profile: &'a LanguageProfile,
}

/// The ordered hooks of every stage.
#[derive(Debug, Clone)]
pub struct HookPipeline {
    pub pre: Vec<PreParseHook>,
    pub post: Vec<PostParseHook>,
    pub html: Vec<HtmlHook>,
}

impl Default for HookPipeline {
    fn default() -> Self {
        Self {
            pre: Vec::new(),
            post: vec![PostParseHook::Markdown],
            html: HtmlHook::ALL.to_vec(),
        }
    }
}

impl HookPipeline {
    /// No hooks at all: blocks pass through exactly as lexed.
    pub fn empty() -> Self {
        Self {
            pre: Vec::new(),
            post: Vec::new(),
            html: Vec::new(),
        }
    }

    pub fn with_pre(mut self, hook: PreParseHook) -> Self {
        self.pre.push(hook);
        self
    }

    pub fn with_post(mut self, hook: PostParseHook) -> Self {
        self.post.push(hook);
        self
    }

    pub fn html_hooks(&self, role: HtmlRole) -> Vec<HtmlHook> {
        self.html
            .iter()
            .copied()
            .filter(|hook| hook.role() == role)
            .collect()
    }

    pub fn pre_forward(&self, text: String, ctx: &HookContext<'_>) -> Result<String, HookError> {
        self.pre
            .iter()
            .try_fold(text, |text, hook| hook.forward(&text, ctx))
    }

    pub fn pre_reverse(&self, text: String, ctx: &HookContext<'_>) -> Result<String, HookError> {
        self.pre
            .iter()
            .rev()
            .try_fold(text, |text, hook| hook.reverse(&text, ctx))
    }

    pub fn post_forward(
        &self,
        blocks: Vec<Block>,
        ctx: &HookContext<'_>,
    ) -> Result<Vec<Block>, HookError> {
        self.post
            .iter()
            .try_fold(blocks, |blocks, hook| hook.forward(blocks, ctx))
    }

    pub fn post_reverse(
        &self,
        blocks: Vec<Block>,
        ctx: &HookContext<'_>,
    ) -> Result<Vec<Block>, HookError> {
        self.post
            .iter()
            .rev()
            .try_fold(blocks, |blocks, hook| hook.reverse(blocks, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LanguageTable;

    fn upper(text: &str, _: &HookContext<'_>) -> anyhow::Result<String> {
        Ok(text.to_uppercase())
    }

    fn lower(text: &str, _: &HookContext<'_>) -> anyhow::Result<String> {
        Ok(text.to_lowercase())
    }

    fn suffix(text: &str, _: &HookContext<'_>) -> anyhow::Result<String> {
        Ok(format!("{text}!"))
    }

    fn unsuffix(text: &str, _: &HookContext<'_>) -> anyhow::Result<String> {
        Ok(text.trim_end_matches('!').to_string())
    }

    #[test]
    fn pre_hooks_run_in_reverse_order_on_save() {
        let table = LanguageTable::builtin();
        let ctx = HookContext {
            path: RelativePath::new("a.py"),
            profile: table.by_name("python").unwrap(),
        };
        let pipeline = HookPipeline::empty()
            .with_pre(PreParseHook::Custom {
                name: "case",
                forward: upper,
                reverse: lower,
            })
            .with_pre(PreParseHook::Custom {
                name: "bang",
                forward: suffix,
                reverse: unsuffix,
            });

        let loaded = pipeline.pre_forward("abc".to_string(), &ctx).unwrap();
        assert_eq!(loaded, "ABC!");
        assert_eq!(pipeline.pre_reverse(loaded, &ctx).unwrap(), "abc");
    }

    #[test]
    fn html_hooks_split_by_role() {
        let pipeline = HookPipeline::default();
        assert_eq!(
            pipeline.html_hooks(HtmlRole::Cache),
            vec![
                HtmlHook::AnchorIds,
                HtmlHook::OutgoingLinks,
                HtmlHook::TocStructure
            ]
        );
        assert_eq!(
            pipeline.html_hooks(HtmlRole::CrossReference),
            vec![HtmlHook::AutoTitle]
        );
    }
}
