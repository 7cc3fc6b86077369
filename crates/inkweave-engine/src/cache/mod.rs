//! # Anchor/TOC Cache
//!
//! Per-file and per-anchor records for a whole project, so cross-references, back-links
//! and the table of contents resolve without rescanning every file on every request.
//!
//! ## Freshness
//!
//! A [`FileCacheEntry`] is trusted only while its [`CacheStamp`] is at or after the
//! file's modification time. [`CacheStamp::Invalid`] forces a recompute on the next
//! load. Anchors and links derived from a file stay in place until a later update for
//! the same file replaces them wholesale.
//!
//! ## Consistency
//!
//! Only the requested file is ever refreshed. Entries of other files are read as they
//! are, possibly stale; there is no project-wide invalidation cascade.

pub mod numbering;
pub mod sessions;
pub mod shared;
pub mod toc;

pub use numbering::{Outline, OutlineItem, build_outline};
pub use sessions::{ClosedSession, EditNotice, SessionHub, SessionId};
pub use shared::SharedProject;
pub use toc::{NavLink, NavLinks, TocEntry, TocListItem, TocStructure};

use relative_path::{RelativePath, RelativePathBuf};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::SystemTime;

/// Numbering depth used when nothing else is configured ("number depths 1-4").
pub const DEFAULT_NUMBERING_DEPTH: usize = 4;

/// Staleness marker of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CacheStamp {
    /// Sentinel that sorts before every real time and forces a recompute.
    Invalid,
    At(SystemTime),
}

impl CacheStamp {
    /// True when the entry was computed at or after `modified`.
    pub fn is_fresh_for(&self, modified: SystemTime) -> bool {
        match self {
            CacheStamp::Invalid => false,
            CacheStamp::At(stamp) => *stamp >= modified,
        }
    }
}

/// Whether the server is serving a whole project or a lone file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectMode {
    SingleFile,
    Project { toc_path: RelativePathBuf },
}

/// Global address of an anchor. A file-level reference uses an empty `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorKey {
    pub file: RelativePathBuf,
    pub id: String,
}

impl AnchorKey {
    pub fn new(file: impl Into<RelativePathBuf>, id: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            id: id.into(),
        }
    }

    pub fn file_level(file: impl Into<RelativePathBuf>) -> Self {
        Self::new(file, "")
    }

    pub fn is_file_level(&self) -> bool {
        self.id.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorKind {
    Heading { level: u8 },
    /// Any other element carrying an id (images, figures, named spans...).
    Element { tag: String },
}

/// A linkable element of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub owning_file: RelativePathBuf,
    pub id: String,
    pub kind: AnchorKind,
    /// Plain text used for auto-titled references.
    pub title: String,
    /// The serialized element, for reference previews.
    pub outer_markup: String,
    /// Position within the file's heading numbering, e.g. `2.1`.
    pub local_number: Option<String>,
}

impl Anchor {
    pub fn key(&self) -> AnchorKey {
        AnchorKey::new(self.owning_file.clone(), self.id.clone())
    }
}

/// A reference from `source` (the nearest heading above it, or the file itself) to
/// `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub source: AnchorKey,
    pub target: AnchorKey,
}

/// One heading in a file's outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingNode {
    pub id: String,
    pub level: u8,
    pub title: String,
    pub number: Option<String>,
    /// Ids of non-heading anchors between this heading and the next one.
    pub contained_anchors: Vec<String>,
    pub children: Vec<HeadingNode>,
}

impl HeadingNode {
    /// Depth-first iteration over this node and its descendants.
    pub fn walk(&self) -> Vec<&HeadingNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCacheEntry {
    pub timestamp: CacheStamp,
    /// This file's number in the project's table of contents.
    pub toc_numbering: Option<String>,
    pub headings: Vec<HeadingNode>,
    /// Anchors that appear before the first heading.
    pub preamble_anchors: Vec<String>,
    pub title: Option<String>,
}

impl FileCacheEntry {
    pub fn is_fresh_for(&self, modified: SystemTime) -> bool {
        self.timestamp.is_fresh_for(modified)
    }
}

/// Everything a cache-hook scan learned about one file, committed in one step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileUpdate {
    pub path: RelativePathBuf,
    pub headings: Vec<HeadingNode>,
    pub preamble_anchors: Vec<String>,
    pub title: Option<String>,
    pub anchors: Vec<Anchor>,
    pub links: Vec<Link>,
    /// Set when the scanned file is the project's table of contents.
    pub toc: Option<TocStructure>,
}

impl FileUpdate {
    pub fn anchor(&self, id: &str) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.id == id)
    }
}

/// Everything the cache holds for one file, taken before a save so a failed write
/// can put it back.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSnapshot {
    path: RelativePathBuf,
    entry: Option<FileCacheEntry>,
    anchors: Vec<Anchor>,
    links: Vec<Link>,
    /// The project's TOC, captured only when `path` is the TOC root.
    toc: Option<Option<TocStructure>>,
}

/// Process-wide cache of anchors, links and the table of contents.
#[derive(Debug, Clone)]
pub struct ProjectState {
    mode: ProjectMode,
    numbering_depth: usize,
    file_cache: HashMap<RelativePathBuf, FileCacheEntry>,
    anchors: HashMap<AnchorKey, Anchor>,
    links: BTreeSet<Link>,
    toc: Option<TocStructure>,
}

impl ProjectState {
    pub fn single_file() -> Self {
        Self::new(ProjectMode::SingleFile, DEFAULT_NUMBERING_DEPTH)
    }

    pub fn project(toc_path: impl Into<RelativePathBuf>, numbering_depth: usize) -> Self {
        Self::new(
            ProjectMode::Project {
                toc_path: toc_path.into(),
            },
            numbering_depth,
        )
    }

    pub fn new(mode: ProjectMode, numbering_depth: usize) -> Self {
        Self {
            mode,
            numbering_depth,
            file_cache: HashMap::new(),
            anchors: HashMap::new(),
            links: BTreeSet::new(),
            toc: None,
        }
    }

    pub fn mode(&self) -> &ProjectMode {
        &self.mode
    }

    pub fn is_project(&self) -> bool {
        matches!(self.mode, ProjectMode::Project { .. })
    }

    pub fn toc_path(&self) -> Option<&RelativePath> {
        match &self.mode {
            ProjectMode::Project { toc_path } => Some(toc_path),
            ProjectMode::SingleFile => None,
        }
    }

    pub fn is_toc(&self, path: &RelativePath) -> bool {
        self.toc_path() == Some(path)
    }

    /// How many heading levels receive numbers. The presentation layer mirrors this.
    pub fn numbering_depth(&self) -> usize {
        self.numbering_depth
    }

    pub fn file(&self, path: &RelativePath) -> Option<&FileCacheEntry> {
        self.file_cache.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = (&RelativePathBuf, &FileCacheEntry)> {
        self.file_cache.iter()
    }

    pub fn is_fresh(&self, path: &RelativePath, modified: SystemTime) -> bool {
        self.file(path).is_some_and(|e| e.is_fresh_for(modified))
    }

    pub fn anchor(&self, key: &AnchorKey) -> Option<&Anchor> {
        self.anchors.get(key)
    }

    pub fn anchors_in(&self, path: &RelativePath) -> Vec<&Anchor> {
        let mut anchors: Vec<_> = self
            .anchors
            .values()
            .filter(|a| a.owning_file == path)
            .collect();
        anchors.sort_by(|a, b| a.id.cmp(&b.id));
        anchors
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Every recorded link whose target is `target`, in link order.
    pub fn back_links(&self, target: &AnchorKey) -> Vec<&Link> {
        self.links.iter().filter(|l| &l.target == target).collect()
    }

    pub fn toc(&self) -> Option<&TocStructure> {
        self.toc.as_ref()
    }

    /// Title for an auto-titled reference to `key`.
    pub fn title_of(&self, key: &AnchorKey) -> Option<&str> {
        if key.is_file_level() {
            return self.file(&key.file)?.title.as_deref();
        }
        self.anchor(key).map(|a| a.title.as_str())
    }

    /// Position of `path` in the table of contents: previous, next and parent entries.
    pub fn nav_for(&self, path: &RelativePath) -> NavLinks {
        self.toc
            .as_ref()
            .map(|toc| toc.nav_for(path))
            .unwrap_or_default()
    }

    pub fn toc_number_for(&self, path: &RelativePath) -> Option<String> {
        self.toc
            .as_ref()
            .and_then(|toc| toc.number_for(path))
            .map(str::to_string)
    }

    /// Commits a scan of one file. The file's previous anchors and outgoing links are
    /// replaced as a whole, so readers never see a half-updated file.
    pub fn apply_update(&mut self, update: FileUpdate, stamp: SystemTime) {
        let FileUpdate {
            path,
            headings,
            preamble_anchors,
            title,
            anchors,
            links,
            toc,
        } = update;

        self.anchors.retain(|key, _| key.file != path);
        for anchor in anchors {
            self.anchors.insert(anchor.key(), anchor);
        }

        self.links.retain(|link| link.source.file != path);
        self.links.extend(links);

        if let Some(toc) = toc {
            self.toc = Some(toc);
            self.renumber_files();
        }

        let toc_numbering = self.toc_number_for(&path);
        log::debug!(
            "cache updated for {path}: {} anchors, {} outgoing links",
            self.anchors.values().filter(|a| a.owning_file == path).count(),
            self.links.iter().filter(|l| l.source.file == path).count(),
        );
        self.file_cache.insert(
            path,
            FileCacheEntry {
                timestamp: CacheStamp::At(stamp),
                toc_numbering,
                headings,
                preamble_anchors,
                title,
            },
        );
    }

    pub fn snapshot_file(&self, path: &RelativePath) -> FileSnapshot {
        FileSnapshot {
            path: path.to_relative_path_buf(),
            entry: self.file_cache.get(path).cloned(),
            anchors: self
                .anchors
                .values()
                .filter(|a| a.owning_file == path)
                .cloned()
                .collect(),
            links: self
                .links
                .iter()
                .filter(|l| l.source.file == path)
                .cloned()
                .collect(),
            toc: self.is_toc(path).then(|| self.toc.clone()),
        }
    }

    /// Puts one file's entry, anchors and outgoing links back exactly as snapshotted.
    pub fn restore_file(&mut self, snapshot: FileSnapshot) {
        let FileSnapshot {
            path,
            entry,
            anchors,
            links,
            toc,
        } = snapshot;

        self.anchors.retain(|key, _| key.file != path);
        for anchor in anchors {
            self.anchors.insert(anchor.key(), anchor);
        }

        self.links.retain(|link| link.source.file != path);
        self.links.extend(links);

        if let Some(toc) = toc {
            self.toc = toc;
            self.renumber_files();
        }

        log::debug!("restored cache entry for {path}");
        match entry {
            Some(entry) => {
                self.file_cache.insert(path, entry);
            }
            None => {
                self.file_cache.remove(&path);
            }
        }
    }

    /// Forces the next load of `path` to recompute its entry. Anchors and links derived
    /// from the last saved state are kept until that recompute replaces them.
    pub fn invalidate(&mut self, path: &RelativePath) {
        if let Some(entry) = self.file_cache.get_mut(path) {
            log::debug!("invalidating cache entry for {path}");
            entry.timestamp = CacheStamp::Invalid;
        }
    }

    /// Moves the entry's timestamp forward to `modified`, e.g. after the file was
    /// written. Never moves it backwards and never revives an invalid entry.
    pub fn stamp(&mut self, path: &RelativePath, modified: SystemTime) {
        if let Some(entry) = self.file_cache.get_mut(path)
            && let CacheStamp::At(current) = entry.timestamp
            && current < modified
        {
            entry.timestamp = CacheStamp::At(modified);
        }
    }

    /// Re-keys the entry, anchors and outgoing links of `from` under `to`. Links from
    /// other files still target `from`, as do TOC entries, until those files (or the
    /// TOC) are scanned again.
    pub fn rename_file(&mut self, from: &RelativePath, to: &RelativePath) {
        let to_buf = to.to_relative_path_buf();

        if let Some(entry) = self.file_cache.remove(from) {
            self.file_cache.insert(to_buf.clone(), entry);
        }

        let moved: Vec<AnchorKey> = self
            .anchors
            .keys()
            .filter(|key| key.file == from)
            .cloned()
            .collect();
        for key in moved {
            if let Some(mut anchor) = self.anchors.remove(&key) {
                anchor.owning_file = to_buf.clone();
                self.anchors.insert(anchor.key(), anchor);
            }
        }

        let links = std::mem::take(&mut self.links);
        self.links = links
            .into_iter()
            .map(|mut link| {
                if link.source.file == from {
                    link.source.file = to_buf.clone();
                }
                link
            })
            .collect();

        if self.toc_path() == Some(from) {
            self.mode = ProjectMode::Project {
                toc_path: to_buf.clone(),
            };
        }
        log::info!("renamed {from} to {to} in the project cache");
    }

    fn renumber_files(&mut self) {
        let Some(toc) = &self.toc else {
            return;
        };
        for (path, entry) in self.file_cache.iter_mut() {
            entry.toc_numbering = toc.number_for(path).map(str::to_string);
        }
    }
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::single_file()
    }
}
