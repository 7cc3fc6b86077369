use relative_path::{RelativePath, RelativePathBuf};
use serde::{Deserialize, Serialize};

use super::AnchorKey;

/// A list item of the table-of-contents file, as seen by the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocListItem {
    /// Inside an `<ol>` rather than a `<ul>`.
    pub ordered: bool,
    /// 1-based position among its siblings, honouring the list's `start`.
    pub index: usize,
    /// Index of the enclosing list item, if nested.
    pub parent: Option<usize>,
    /// Number of the heading the list sits under, for top-level items.
    pub heading_number: Option<String>,
    /// First link inside the item.
    pub target: Option<AnchorKey>,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub target: Option<AnchorKey>,
    pub title: String,
    pub number: Option<String>,
    pub parent: Option<usize>,
}

/// The project's table of contents in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TocStructure {
    pub entries: Vec<TocEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub path: RelativePathBuf,
    pub anchor: Option<String>,
    pub title: String,
    pub number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavLinks {
    pub prev: Option<NavLink>,
    pub next: Option<NavLink>,
    pub up: Option<NavLink>,
}

impl TocStructure {
    /// Numbers the scanned list items.
    ///
    /// Heading numbers come first: a top-level list continues the number of the
    /// heading it sits under. Each ordered item then appends its own index to its
    /// parent's number. Unordered items get no number but pass their parent's on.
    pub fn from_list_items(items: Vec<TocListItem>) -> Self {
        let mut bases: Vec<Option<String>> = Vec::with_capacity(items.len());
        let mut entries = Vec::with_capacity(items.len());

        for item in items {
            let base = match item.parent {
                Some(parent) => bases.get(parent).cloned().flatten(),
                None => item.heading_number.clone(),
            };
            let number = item.ordered.then(|| match &base {
                Some(base) => format!("{base}.{}", item.index),
                None => item.index.to_string(),
            });
            bases.push(number.clone().or(base));
            entries.push(TocEntry {
                target: item.target,
                title: item.title,
                number,
                parent: item.parent,
            });
        }

        Self { entries }
    }

    /// Index of the entry that stands for `path`: its first file-level link, or
    /// failing that its first link to any anchor in it.
    pub fn entry_for(&self, path: &RelativePath) -> Option<usize> {
        let targets = |file_level: bool| {
            self.entries.iter().position(|e| {
                e.target
                    .as_ref()
                    .is_some_and(|t| t.file == path && (!file_level || t.is_file_level()))
            })
        };
        targets(true).or_else(|| targets(false))
    }

    pub fn number_for(&self, path: &RelativePath) -> Option<&str> {
        self.entries[self.entry_for(path)?].number.as_deref()
    }

    pub fn nav_for(&self, path: &RelativePath) -> NavLinks {
        let Some(index) = self.entry_for(path) else {
            return NavLinks::default();
        };
        let elsewhere = |entry: &&TocEntry| entry.target.as_ref().is_some_and(|t| t.file != path);

        let prev = self.entries[..index].iter().rev().find(elsewhere);
        let next = self.entries[index + 1..].iter().find(elsewhere);

        let mut up = None;
        let mut parent = self.entries[index].parent;
        while let Some(p) = parent {
            let entry = &self.entries[p];
            if elsewhere(&entry) {
                up = Some(entry);
                break;
            }
            parent = entry.parent;
        }

        NavLinks {
            prev: prev.and_then(nav_link),
            next: next.and_then(nav_link),
            up: up.and_then(nav_link),
        }
    }
}

fn nav_link(entry: &TocEntry) -> Option<NavLink> {
    let target = entry.target.as_ref()?;
    Some(NavLink {
        path: target.file.clone(),
        anchor: (!target.is_file_level()).then(|| target.id.clone()),
        title: entry.title.clone(),
        number: entry.number.clone(),
    })
}
