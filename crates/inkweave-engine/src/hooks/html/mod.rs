//! HTML-stage plumbing: doc-block fragments, the hook registry and the single walk that
//! feeds every interested hook.

pub mod links;
pub mod slug;
pub mod to_markdown;

pub use links::resolve_href;
pub use slug::{IdAllocator, slugify};
pub use to_markdown::html_to_markdown;

use kuchikiki::NodeRef;
use kuchikiki::traits::*;
use std::collections::HashMap;

use crate::error::HookError;
use crate::models::Block;

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Matches every element.
pub const ANY_TAG: &str = "*";

/// When an HTML-stage hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlRole {
    /// Populates this file's cache entry. Runs on load only while the entry is stale,
    /// and on every save.
    Cache,
    /// Reads other files' entries to rewrite dependent tags. Always runs.
    CrossReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HtmlHook {
    /// Records headings and other id-carrying elements; assigns missing ids.
    AnchorIds,
    /// Records every `<a href>` as a link from the nearest heading.
    OutgoingLinks,
    /// Reads the table-of-contents lists. Only active on the project's TOC file.
    TocStructure,
    /// Fills `<a class="autotitle">` with the title of its target.
    AutoTitle,
}

impl HtmlHook {
    pub const ALL: [HtmlHook; 4] = [
        HtmlHook::AnchorIds,
        HtmlHook::OutgoingLinks,
        HtmlHook::TocStructure,
        HtmlHook::AutoTitle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HtmlHook::AnchorIds => "anchor-ids",
            HtmlHook::OutgoingLinks => "outgoing-links",
            HtmlHook::TocStructure => "toc-structure",
            HtmlHook::AutoTitle => "auto-title",
        }
    }

    pub fn role(&self) -> HtmlRole {
        match self {
            HtmlHook::AutoTitle => HtmlRole::CrossReference,
            _ => HtmlRole::Cache,
        }
    }

    pub fn interested_tags(&self) -> &'static [&'static str] {
        match self {
            HtmlHook::AnchorIds => &[ANY_TAG],
            HtmlHook::OutgoingLinks | HtmlHook::AutoTitle => &["a"],
            HtmlHook::TocStructure => &["li", "a"],
        }
    }
}

/// Tag name to the hooks interested in it, in registration order.
#[derive(Debug, Default)]
pub struct TagDispatch {
    hooks: Vec<HtmlHook>,
    by_tag: HashMap<&'static str, Vec<usize>>,
    any: Vec<usize>,
}

impl TagDispatch {
    pub fn new(hooks: &[HtmlHook]) -> Self {
        let mut dispatch = Self {
            hooks: hooks.to_vec(),
            ..Self::default()
        };
        for (index, hook) in hooks.iter().enumerate() {
            for &tag in hook.interested_tags() {
                if tag == ANY_TAG {
                    dispatch.any.push(index);
                } else {
                    dispatch.by_tag.entry(tag).or_default().push(index);
                }
            }
        }
        dispatch
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn hooks_for(&self, tag: &str) -> Vec<HtmlHook> {
        let mut indices: Vec<usize> = self
            .by_tag
            .get(tag)
            .into_iter()
            .flatten()
            .chain(&self.any)
            .copied()
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(|i| self.hooks[i]).collect()
    }
}

/// Receives the elements a hook asked for. Returns whether the element was changed.
pub trait HtmlVisitor {
    fn visit(&mut self, hook: HtmlHook, element: &NodeRef, fragment: usize)
    -> Result<bool, HookError>;
}

/// The parsed HTML of one doc block.
#[derive(Debug, Clone)]
pub struct HtmlFragment {
    block: usize,
    body: NodeRef,
    modified: bool,
}

impl HtmlFragment {
    pub fn parse(block: usize, html: &str) -> Self {
        let document = kuchikiki::parse_html().one(html);
        let body = document
            .select("body")
            .ok()
            .and_then(|mut found| found.next())
            .map(|body| body.as_node().clone());
        let body = body.unwrap_or(document);
        Self {
            block,
            body,
            modified: false,
        }
    }

    pub fn block(&self) -> usize {
        self.block
    }

    pub fn body(&self) -> &NodeRef {
        &self.body
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Elements in document order. Collected up front so hooks may edit the tree.
    pub fn elements(&self) -> Vec<NodeRef> {
        self.body
            .descendants()
            .filter(|node| node.as_element().is_some())
            .collect()
    }

    pub fn serialize(&self) -> String {
        self.body.children().map(|child| child.to_string()).collect()
    }
}

/// The doc blocks of one page, parsed for the HTML stage.
#[derive(Debug, Clone, Default)]
pub struct DocFragments {
    fragments: Vec<HtmlFragment>,
}

impl DocFragments {
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let fragments = blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| block.is_doc())
            .map(|(index, block)| HtmlFragment::parse(index, &block.content))
            .collect();
        Self { fragments }
    }

    pub fn fragments(&self) -> &[HtmlFragment] {
        &self.fragments
    }

    pub fn mark_modified(&mut self, fragment: usize) {
        if let Some(fragment) = self.fragments.get_mut(fragment) {
            fragment.mark_modified();
        }
    }

    pub fn any_modified(&self) -> bool {
        self.fragments.iter().any(HtmlFragment::is_modified)
    }

    /// Visits every element once and hands it to each hook interested in its tag.
    pub fn walk(
        &mut self,
        hooks: &[HtmlHook],
        visitor: &mut impl HtmlVisitor,
    ) -> Result<(), HookError> {
        let dispatch = TagDispatch::new(hooks);
        if dispatch.is_empty() {
            return Ok(());
        }
        for (index, fragment) in self.fragments.iter_mut().enumerate() {
            for element in fragment.elements() {
                let Some(tag) = tag_name(&element) else {
                    continue;
                };
                for hook in dispatch.hooks_for(&tag) {
                    if visitor.visit(hook, &element, index)? {
                        fragment.mark_modified();
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes changed fragments back into the blocks they came from. Unchanged
    /// fragments keep their original markup byte for byte.
    pub fn write_back(&self, blocks: &mut [Block]) {
        for fragment in self.fragments.iter().filter(|f| f.is_modified()) {
            if let Some(block) = blocks.get_mut(fragment.block) {
                block.content = fragment.serialize();
            }
        }
    }
}

pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element().map(|e| e.name.local.to_string())
}

pub fn heading_level(tag: &str) -> Option<u8> {
    HEADING_TAGS
        .iter()
        .position(|h| *h == tag)
        .and_then(|i| u8::try_from(i + 1).ok())
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    let attributes = element.attributes.borrow();
    attributes.get(name).map(str::to_string)
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(element) = node.as_element() {
        element
            .attributes
            .borrow_mut()
            .insert(name, value.to_string());
    }
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    attr(node, "class").is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Text content with runs of whitespace collapsed, as used for titles and slugs.
pub fn plain_text(node: &NodeRef) -> String {
    node.text_contents()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replaces all children of `node` with a single text node.
pub fn replace_text(node: &NodeRef, text: &str) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    node.append(NodeRef::new_text(text));
}
