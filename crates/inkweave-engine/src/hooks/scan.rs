//! The cache-role visitor: collects what [`HtmlHook::AnchorIds`],
//! [`HtmlHook::OutgoingLinks`] and [`HtmlHook::TocStructure`] see during the walk and
//! turns it into one [`FileUpdate`].

use kuchikiki::NodeRef;
use relative_path::RelativePath;
use std::collections::HashMap;

use super::html::{
    DocFragments, HtmlHook, HtmlVisitor, IdAllocator, attr, heading_level, plain_text,
    resolve_href, set_attr, tag_name,
};
use crate::cache::{
    Anchor, AnchorKey, AnchorKind, FileUpdate, Link, OutlineItem, TocListItem, TocStructure,
    build_outline,
};
use crate::error::HookError;

#[derive(Debug)]
struct ScannedAnchor {
    node: NodeRef,
    fragment: usize,
    tag: String,
    level: Option<u8>,
    id: Option<String>,
    title: String,
}

#[derive(Debug)]
struct ScannedLink {
    heading: Option<usize>,
    target: AnchorKey,
}

#[derive(Debug)]
struct ScannedItem {
    node: NodeRef,
    ordered: bool,
    index: usize,
    parent: Option<usize>,
    heading: Option<usize>,
    target: Option<AnchorKey>,
    title: String,
}

/// Accumulates one file's anchors, links and table of contents during the walk.
///
/// Missing ids are only assigned in [`CacheScan::finish`], once every id in the file
/// is known, so generated ids never collide with ids that appear later.
#[derive(Debug)]
pub struct CacheScan<'a> {
    path: &'a RelativePath,
    numbering_depth: usize,
    toc_enabled: bool,
    anchors: Vec<ScannedAnchor>,
    current_heading: Option<usize>,
    links: Vec<ScannedLink>,
    toc_items: Vec<ScannedItem>,
}

impl<'a> CacheScan<'a> {
    pub fn new(path: &'a RelativePath, numbering_depth: usize, toc_enabled: bool) -> Self {
        Self {
            path,
            numbering_depth,
            toc_enabled,
            anchors: Vec::new(),
            current_heading: None,
            links: Vec::new(),
            toc_items: Vec::new(),
        }
    }

    fn visit_anchor(&mut self, element: &NodeRef, tag: &str, fragment: usize) {
        let level = heading_level(tag);
        let id = attr(element, "id").filter(|id| !id.is_empty());
        let addressable = level.is_some() || matches!(tag, "img" | "figure");
        if id.is_none() && !addressable {
            return;
        }

        let title = match tag {
            "img" => attr(element, "alt").unwrap_or_default(),
            _ => plain_text(element),
        };
        if level.is_some() {
            self.current_heading = Some(self.anchors.len());
        }
        self.anchors.push(ScannedAnchor {
            node: element.clone(),
            fragment,
            tag: tag.to_string(),
            level,
            id,
            title,
        });
    }

    fn visit_link(&mut self, element: &NodeRef) {
        let Some(href) = attr(element, "href") else {
            return;
        };
        if let Some(target) = resolve_href(self.path, &href) {
            self.links.push(ScannedLink {
                heading: self.current_heading,
                target,
            });
        }
    }

    fn visit_toc(&mut self, element: &NodeRef, tag: &str) {
        match tag {
            "li" => {
                let Some(list) = element.parent() else {
                    return;
                };
                let ordered = tag_name(&list).as_deref() == Some("ol");
                let start = attr(&list, "start")
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(1);
                let before = element
                    .preceding_siblings()
                    .filter(|s| tag_name(s).as_deref() == Some("li"))
                    .count();
                let parent = self.enclosing_item(&list);
                self.toc_items.push(ScannedItem {
                    node: element.clone(),
                    ordered,
                    index: start + before,
                    parent,
                    heading: self.current_heading,
                    target: None,
                    title: String::new(),
                });
            }
            "a" => {
                let Some(item) = self.enclosing_item(element) else {
                    return;
                };
                let target = attr(element, "href").and_then(|href| resolve_href(self.path, &href));
                let entry = &mut self.toc_items[item];
                if entry.target.is_none()
                    && let Some(target) = target
                {
                    entry.target = Some(target);
                    entry.title = plain_text(element);
                }
            }
            _ => {}
        }
    }

    /// The scanned list item that most closely contains `node` (or is `node`).
    fn enclosing_item(&self, node: &NodeRef) -> Option<usize> {
        let li = node
            .inclusive_ancestors()
            .find(|n| tag_name(n).as_deref() == Some("li"))?;
        self.toc_items.iter().rposition(|item| item.node == li)
    }

    /// Assigns missing ids, builds the outline and produces the update to commit.
    pub fn finish(self, fragments: &mut DocFragments) -> FileUpdate {
        let Self {
            path,
            numbering_depth,
            toc_enabled,
            mut anchors,
            links,
            toc_items,
            ..
        } = self;

        let mut ids = IdAllocator::with_taken(anchors.iter().filter_map(|a| a.id.clone()));
        for anchor in anchors.iter_mut().filter(|a| a.id.is_none()) {
            let fallback = if anchor.level.is_some() {
                "section"
            } else {
                anchor.tag.as_str()
            };
            let id = ids.allocate(&anchor.title, fallback);
            log::debug!("{path}: assigning id `{id}` to <{}>", anchor.tag);
            set_attr(&anchor.node, "id", &id);
            fragments.mark_modified(anchor.fragment);
            anchor.id = Some(id);
        }

        let items: Vec<OutlineItem> = anchors
            .iter()
            .map(|a| {
                let id = a.id.clone().unwrap_or_default();
                match a.level {
                    Some(level) => OutlineItem::Heading {
                        id,
                        level,
                        title: a.title.clone(),
                    },
                    None => OutlineItem::Anchor { id },
                }
            })
            .collect();
        let outline = build_outline(&items, numbering_depth);
        let numbers: HashMap<&str, Option<String>> = outline
            .headings
            .iter()
            .flat_map(|h| h.walk())
            .map(|h| (h.id.as_str(), h.number.clone()))
            .collect();
        let number_of = |index: usize| -> Option<String> {
            let id = anchors.get(index)?.id.as_deref()?;
            numbers.get(id).cloned().flatten()
        };
        let id_of = |index: Option<usize>| -> String {
            index
                .and_then(|i| anchors.get(i))
                .and_then(|a| a.id.clone())
                .unwrap_or_default()
        };

        let records: Vec<Anchor> = anchors
            .iter()
            .map(|a| {
                let id = a.id.clone().unwrap_or_default();
                Anchor {
                    owning_file: path.to_relative_path_buf(),
                    local_number: numbers.get(id.as_str()).cloned().flatten(),
                    id,
                    kind: match a.level {
                        Some(level) => AnchorKind::Heading { level },
                        None => AnchorKind::Element { tag: a.tag.clone() },
                    },
                    title: a.title.clone(),
                    outer_markup: a.node.to_string(),
                }
            })
            .collect();

        let links: Vec<Link> = links
            .into_iter()
            .map(|link| Link {
                source: AnchorKey::new(path.to_relative_path_buf(), id_of(link.heading)),
                target: link.target,
            })
            .collect();

        let toc = toc_enabled.then(|| {
            TocStructure::from_list_items(
                toc_items
                    .into_iter()
                    .map(|item| TocListItem {
                        ordered: item.ordered,
                        index: item.index,
                        heading_number: match item.parent {
                            Some(_) => None,
                            None => item.heading.and_then(number_of),
                        },
                        parent: item.parent,
                        target: item.target,
                        title: item.title,
                    })
                    .collect(),
            )
        });

        let title = anchors
            .iter()
            .find(|a| a.level == Some(1))
            .or_else(|| anchors.iter().find(|a| a.level.is_some()))
            .map(|a| a.title.clone());

        FileUpdate {
            path: path.to_relative_path_buf(),
            headings: outline.headings,
            preamble_anchors: outline.preamble_anchors,
            title,
            anchors: records,
            links,
            toc,
        }
    }
}

impl HtmlVisitor for CacheScan<'_> {
    fn visit(
        &mut self,
        hook: HtmlHook,
        element: &NodeRef,
        fragment: usize,
    ) -> Result<bool, HookError> {
        let Some(tag) = tag_name(element) else {
            return Ok(false);
        };
        match hook {
            HtmlHook::AnchorIds => self.visit_anchor(element, &tag, fragment),
            HtmlHook::OutgoingLinks if tag == "a" => self.visit_link(element),
            HtmlHook::TocStructure if self.toc_enabled => self.visit_toc(element, &tag),
            _ => {}
        }
        // Ids are written in `finish`; nothing changes during the walk.
        Ok(false)
    }
}
