use relative_path::RelativePathBuf;

use crate::cache::{Anchor, AnchorKey, AnchorKind, FileUpdate, Link, ProjectState};
use crate::io::MemoryPersistence;
use crate::processor::Processor;
use crate::project::Project;

/// An update for `path` with heading anchors `ids` and links given as
/// `(source file, source id, target file, target id)`.
pub fn update_with(path: &str, ids: &[&str], links: &[(&str, &str, &str, &str)]) -> FileUpdate {
    FileUpdate {
        path: RelativePathBuf::from(path),
        anchors: ids.iter().map(|id| heading_anchor(path, id, id)).collect(),
        links: links
            .iter()
            .map(|(sf, si, tf, ti)| Link {
                source: AnchorKey::new(*sf, *si),
                target: AnchorKey::new(*tf, *ti),
            })
            .collect(),
        ..FileUpdate::default()
    }
}

pub fn heading_anchor(file: &str, id: &str, title: &str) -> Anchor {
    Anchor {
        owning_file: RelativePathBuf::from(file),
        id: id.to_string(),
        kind: AnchorKind::Heading { level: 1 },
        title: title.to_string(),
        outer_markup: format!("<h1 id=\"{id}\">{title}</h1>"),
        local_number: None,
    }
}

/// A single-file project over in-memory files.
pub fn memory_project(files: &[(&str, &str)]) -> Project<MemoryPersistence> {
    let persistence = MemoryPersistence::new();
    for (path, text) in files {
        persistence.insert(*path, *text);
    }
    Project::new(persistence, ProjectState::single_file(), Processor::default())
}
