use relative_path::{RelativePath, RelativePathBuf};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ProjectState, SessionHub};

/// The long-lived owner of a project's [`ProjectState`], shared by every request.
///
/// Work on one path is serialized through a per-path section; work on different
/// paths runs concurrently and only contends on the state lock for the short
/// read or commit steps.
#[derive(Debug, Default)]
pub struct SharedProject {
    state: RwLock<ProjectState>,
    sections: Mutex<HashMap<RelativePathBuf, Arc<Mutex<()>>>>,
    sessions: SessionHub,
}

impl SharedProject {
    pub fn new(state: ProjectState) -> Self {
        Self {
            state: RwLock::new(state),
            sections: Mutex::new(HashMap::new()),
            sessions: SessionHub::default(),
        }
    }

    /// Read access to the state. A panic in another holder does not poison the cache
    /// for everyone else; commits are single assignments, so the data is consistent.
    pub fn read(&self) -> RwLockReadGuard<'_, ProjectState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ProjectState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn sessions(&self) -> &SessionHub {
        &self.sessions
    }

    /// Runs `f` inside the critical section for `path`.
    ///
    /// Sections are not re-entrant: `f` must not enter the section of the same path.
    pub fn with_section<R>(&self, path: &RelativePath, f: impl FnOnce() -> R) -> R {
        let section = self.section(path);
        let result = {
            let _guard = lock(&section);
            f()
        };
        drop(section);
        self.release(path);
        result
    }

    fn section(&self, path: &RelativePath) -> Arc<Mutex<()>> {
        let mut sections = lock(&self.sections);
        sections
            .entry(path.to_relative_path_buf())
            .or_default()
            .clone()
    }

    /// Forgets the section of `path` once nobody holds or waits for it, so the map
    /// only holds paths currently being worked on.
    fn release(&self, path: &RelativePath) {
        let mut sections = lock(&self.sections);
        if sections
            .get(path)
            .is_some_and(|section| Arc::strong_count(section) == 1)
        {
            sections.remove(path);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_path_sections_do_not_overlap() {
        let shared = Arc::new(SharedProject::default());
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = Arc::clone(&shared);
                let inside = Arc::clone(&inside);
                let overlaps = Arc::clone(&overlaps);
                thread::spawn(move || {
                    shared.with_section(RelativePath::new("a.md"), || {
                        if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::sleep(Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn sections_are_released_after_use() {
        let shared = SharedProject::default();
        shared.with_section(RelativePath::new("a.md"), || {
            shared.with_section(RelativePath::new("b.md"), || {
                assert_eq!(lock(&shared.sections).len(), 2);
            });
            assert_eq!(lock(&shared.sections).len(), 1);
        });
        assert!(lock(&shared.sections).is_empty());
    }

    #[test]
    fn different_paths_do_not_block_each_other() {
        let shared = SharedProject::default();
        let value = shared.with_section(RelativePath::new("a.md"), || {
            shared.with_section(RelativePath::new("b.md"), || 42)
        });
        assert_eq!(value, 42);
    }
}
