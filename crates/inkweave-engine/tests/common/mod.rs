// Test helper functions - each integration test binary compiles this module and only
// uses part of it, so unused helpers are expected.
use inkweave_engine::cache::ProjectState;
use inkweave_engine::{
    FsPersistence, LoadOutcome, MemoryPersistence, Processor, Project, RenderedPage,
};
use tempfile::TempDir;

#[allow(dead_code)]
pub fn page(outcome: LoadOutcome) -> RenderedPage {
    match outcome {
        LoadOutcome::Rendered(page) => page,
        other => panic!("expected a rendered page, got {other:?}"),
    }
}

#[allow(dead_code)]
pub fn fs_project(files: &[(&str, &str)], state: ProjectState) -> (TempDir, Project<FsPersistence>) {
    let root = TempDir::new().unwrap();
    for (path, text) in files {
        let file = root.path().join(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(file, text).unwrap();
    }
    let project = Project::new(
        FsPersistence::new(root.path()),
        state,
        Processor::default(),
    );
    (root, project)
}

#[allow(dead_code)]
pub fn memory_project(files: &[(&str, &str)], state: ProjectState) -> Project<MemoryPersistence> {
    let persistence = MemoryPersistence::new();
    for (path, text) in files {
        persistence.insert(*path, *text);
    }
    Project::new(persistence, state, Processor::default())
}
