use relative_path::RelativePath;
use std::sync::mpsc::Receiver;

use crate::cache::{ClosedSession, EditNotice, ProjectState, SessionId, SharedProject};
use crate::error::ProcessError;
use crate::io::{FileContents, Persistence};
use crate::models::Block;
use crate::processor::{LoadOutcome, LoadRequest, Processor, SaveOutcome, SaveRequest};

/// A project served to editing sessions: persistence, the shared cache and the
/// processor behind one handle.
#[derive(Debug)]
pub struct Project<P> {
    persistence: P,
    shared: SharedProject,
    processor: Processor,
}

impl<P: Persistence> Project<P> {
    pub fn new(persistence: P, state: ProjectState, processor: Processor) -> Self {
        Self {
            persistence,
            shared: SharedProject::new(state),
            processor,
        }
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn shared(&self) -> &SharedProject {
        &self.shared
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Loads the table of contents when its entry is missing or stale, so numbering and
    /// navigation of other files see the current structure.
    pub fn ensure_toc(&self) -> Option<LoadOutcome> {
        let toc = self.shared.read().toc_path()?.to_relative_path_buf();
        self.shared.with_section(&toc, || {
            let contents = self.read_contents(&toc);
            if let Ok(contents) = &contents
                && self.shared.read().is_fresh(&toc, contents.modified)
            {
                return None;
            }
            log::debug!("refreshing table of contents {toc}");
            Some(self.processor.load_unlocked(
                &self.shared,
                LoadRequest {
                    path: toc.clone(),
                    contents,
                    is_toc: true,
                },
            ))
        })
    }

    pub fn load(&self, path: &RelativePath) -> LoadOutcome {
        let is_toc = self.shared.read().is_toc(path);
        if !is_toc {
            self.ensure_toc();
        }
        self.shared.with_section(path, || {
            let contents = self.read_contents(path);
            self.processor.load_unlocked(
                &self.shared,
                LoadRequest {
                    path: path.to_relative_path_buf(),
                    contents,
                    is_toc,
                },
            )
        })
    }

    /// Saves blocks submitted by `session` and tells the other sessions on the path.
    ///
    /// Concurrent saves of one path are serialized; the last one to run wins. When the
    /// write fails the file's cache records are put back as they were before the save.
    pub fn save(
        &self,
        session: Option<SessionId>,
        path: &RelativePath,
        blocks: Vec<Block>,
    ) -> Result<SaveOutcome, ProcessError> {
        let is_toc = self.shared.read().is_toc(path);
        if !is_toc {
            self.ensure_toc();
        }

        let outcome = self.shared.with_section(path, || {
            let previous = self.shared.read().snapshot_file(path);
            let outcome = self.processor.save_unlocked(
                &self.shared,
                SaveRequest {
                    path: path.to_relative_path_buf(),
                    blocks,
                    is_toc,
                },
            )?;
            match self.persistence.write(path, &outcome.persist_text) {
                Ok(modified) => self.shared.write().stamp(path, modified),
                Err(err) => {
                    log::warn!("failed to write {path}: {err}");
                    self.shared.write().restore_file(previous);
                    return Err(ProcessError::Write {
                        path: path.to_relative_path_buf(),
                        reason: err.to_string(),
                    });
                }
            }
            Ok(outcome)
        })?;

        if let Some(id) = session {
            self.shared.sessions().mark_saved(id);
        }
        let blocks = outcome
            .reload
            .as_ref()
            .and_then(|reload| reload.rendered())
            .map(|page| page.blocks.clone())
            .unwrap_or_else(|| outcome.blocks.clone());
        self.shared.sessions().broadcast(EditNotice {
            path: path.to_relative_path_buf(),
            origin: session,
            blocks,
        });
        Ok(outcome)
    }

    pub fn open_session(&self, path: &RelativePath) -> (SessionId, Receiver<EditNotice>) {
        self.shared.sessions().open(path)
    }

    /// Records that `session` holds edits it has not saved yet.
    pub fn mark_edited(&self, session: SessionId) {
        self.shared.sessions().mark_modified(session);
    }

    /// Ends `session`. Unsaved edits invalidate the file's cache entry so the next load
    /// recomputes it from disk.
    pub fn close_session(&self, session: SessionId) -> Option<ClosedSession> {
        let closed = self.shared.sessions().close(session)?;
        if closed.unsaved {
            self.shared
                .with_section(&closed.path, || self.shared.write().invalidate(&closed.path));
        }
        Some(closed)
    }

    /// Moves everything cached for `from` to `to` after the file was renamed.
    pub fn rename(&self, from: &RelativePath, to: &RelativePath) {
        self.shared.write().rename_file(from, to);
    }

    fn read_contents(&self, path: &RelativePath) -> Result<FileContents, String> {
        self.persistence.read(path).map_err(|err| err.to_string())
    }
}
