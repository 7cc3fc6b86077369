use inkweave_engine::cache::ProjectState;
use inkweave_engine::{Block, MemoryPersistence, Project};
use relative_path::RelativePath;
use std::thread;

mod common;

fn heading_block(n: usize) -> Vec<Block> {
    vec![Block::doc("", "", format!("<h1 id=\"v-{n}\">Version {n}</h1>\n"))]
}

#[test]
fn saves_of_different_files_run_side_by_side() {
    let files: Vec<(String, String)> = (0..8)
        .map(|i| (format!("f{i}.md"), format!("# File {i} {{#file-{i}}}\n")))
        .collect();
    let borrowed: Vec<(&str, &str)> = files
        .iter()
        .map(|(p, t)| (p.as_str(), t.as_str()))
        .collect();
    let project = common::memory_project(&borrowed, ProjectState::single_file());

    thread::scope(|s| {
        for i in 0..8 {
            let project = &project;
            s.spawn(move || {
                let path = format!("f{i}.md");
                let path = RelativePath::new(&path);
                for round in 0..5 {
                    let page = common::page(project.load(path));
                    let outcome = project.save(None, path, page.blocks).unwrap();
                    assert!(!outcome.dirty, "file {i} round {round}");
                }
            });
        }
    });

    let state = project.shared().read();
    for i in 0..8 {
        let path = format!("f{i}.md");
        let anchors = state.anchors_in(RelativePath::new(&path));
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].id, format!("file-{i}"));
    }
}

#[test]
fn concurrent_saves_of_one_file_last_write_wins() {
    let project: Project<MemoryPersistence> =
        common::memory_project(&[("shared.md", "# Start {#start}\n")], ProjectState::single_file());
    let path = RelativePath::new("shared.md");

    thread::scope(|s| {
        for n in 0..6 {
            let project = &project;
            s.spawn(move || {
                let outcome = project.save(None, path, heading_block(n)).unwrap();
                assert_eq!(outcome.persist_text, format!("# Version {n} {{#v-{n}}}\n"));
            });
        }
    });

    // Whichever save ran last owns both the file and the cache.
    let on_disk = project.persistence().text(path).unwrap();
    let state = project.shared().read();
    let anchors = state.anchors_in(path);
    assert_eq!(anchors.len(), 1);
    assert!(on_disk.contains(&format!("{{#{}}}", anchors[0].id)));
}

#[test]
fn reads_of_other_files_do_not_wait_for_a_section() {
    let project = common::memory_project(
        &[("a.md", "# A {#a}\n"), ("b.md", "See <a class=\"autotitle\" href=\"a.md#a\">?</a>\n")],
        ProjectState::single_file(),
    );
    common::page(project.load(RelativePath::new("a.md")));

    // Holding a.md's section must not block a load of b.md that reads a.md's anchors.
    project.shared().with_section(RelativePath::new("a.md"), || {
        thread::scope(|s| {
            s.spawn(|| {
                let page = common::page(project.load(RelativePath::new("b.md")));
                assert!(page.blocks[0].content.contains(">A</a>"));
            });
        });
    });
}
