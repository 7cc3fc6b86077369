use pulldown_cmark::{Options, Parser, html};
use std::fmt;

use super::HookContext;
use super::html::html_to_markdown;
use crate::error::HookError;
use crate::models::{Block, BlockKind};

/// A transform over the whole block sequence: `forward` after lexing on load,
/// `reverse` before de-lexing on save.
pub type BlockTransform = fn(Vec<Block>, &HookContext<'_>) -> anyhow::Result<Vec<Block>>;

#[derive(Clone, Copy)]
pub enum PostParseHook {
    /// Doc-block Markdown to HTML on load, and back on save.
    Markdown,
    Custom {
        name: &'static str,
        forward: BlockTransform,
        reverse: BlockTransform,
    },
}

impl PostParseHook {
    pub fn name(&self) -> &'static str {
        match self {
            PostParseHook::Markdown => "markdown",
            PostParseHook::Custom { name, .. } => *name,
        }
    }

    pub fn forward(&self, blocks: Vec<Block>, ctx: &HookContext<'_>) -> Result<Vec<Block>, HookError> {
        match self {
            PostParseHook::Markdown => Ok(blocks
                .into_iter()
                .map(|block| map_doc(block, doc_to_html))
                .collect()),
            PostParseHook::Custom { forward, .. } => {
                forward(blocks, ctx).map_err(|e| HookError::new(self.name(), format!("{e:#}")))
            }
        }
    }

    pub fn reverse(&self, blocks: Vec<Block>, ctx: &HookContext<'_>) -> Result<Vec<Block>, HookError> {
        match self {
            PostParseHook::Markdown => Ok(blocks
                .into_iter()
                .map(|block| map_doc(block, |b| html_to_doc(b, ctx)))
                .collect()),
            PostParseHook::Custom { reverse, .. } => {
                reverse(blocks, ctx).map_err(|e| HookError::new(self.name(), format!("{e:#}")))
            }
        }
    }
}

impl fmt::Debug for PostParseHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostParseHook({})", self.name())
    }
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

fn map_doc(mut block: Block, convert: impl Fn(&Block) -> String) -> Block {
    if block.is_doc() {
        block.content = convert(&block);
    }
    block
}

/// Comment lines keep the space after their delimiter; markup-only documents
/// (empty delimiter) have no such space.
fn has_comment_prefix(block: &Block) -> bool {
    !matches!(&block.kind, BlockKind::Doc(delimiter) if delimiter.is_empty())
}

fn doc_to_html(block: &Block) -> String {
    if has_comment_prefix(block) {
        markdown_to_html(&strip_leading_space(&block.content))
    } else {
        markdown_to_html(&block.content)
    }
}

fn html_to_doc(block: &Block, ctx: &HookContext<'_>) -> String {
    let markdown = html_to_markdown(&block.content);
    if !has_comment_prefix(block) {
        return markdown;
    }

    let mut content = add_leading_space(markdown.trim_end_matches('\n'));
    // Keep a space before a block comment's closer, as in `/* text */`.
    let block_comment = block
        .delimiter()
        .is_some_and(|d| ctx.profile.block_close_for(d).is_some());
    if block_comment && !content.is_empty() {
        content.push(' ');
    }
    content
}

fn strip_leading_space(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect()
}

fn add_leading_space(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!(" {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
