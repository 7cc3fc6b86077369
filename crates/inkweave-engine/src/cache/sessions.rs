use relative_path::{RelativePath, RelativePathBuf};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use uuid::Uuid;

use crate::models::Block;

/// Identifies one editing session (one client view of one file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sent to the other sessions on a path after one of them saved.
#[derive(Debug, Clone, PartialEq)]
pub struct EditNotice {
    pub path: RelativePathBuf,
    pub origin: Option<SessionId>,
    pub blocks: Vec<Block>,
}

#[derive(Debug)]
struct Session {
    path: RelativePathBuf,
    sender: Sender<EditNotice>,
    modified: bool,
}

/// Registry of open sessions. Broadcasts are fire-and-forget: a session whose
/// receiver is gone is dropped, and nothing waits for delivery.
#[derive(Debug, Default)]
pub struct SessionHub {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

/// What closing a session left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub path: RelativePathBuf,
    /// The session reported edits it never saved.
    pub unsaved: bool,
}

impl SessionHub {
    pub fn open(&self, path: &RelativePath) -> (SessionId, Receiver<EditNotice>) {
        let (sender, receiver) = mpsc::channel();
        let id = SessionId::new();
        self.sessions().insert(
            id,
            Session {
                path: path.to_relative_path_buf(),
                sender,
                modified: false,
            },
        );
        log::debug!("opened session {id} on {path}");
        (id, receiver)
    }

    /// Records that the session holds edits not yet saved.
    pub fn mark_modified(&self, id: SessionId) {
        if let Some(session) = self.sessions().get_mut(&id) {
            session.modified = true;
        }
    }

    pub fn mark_saved(&self, id: SessionId) {
        if let Some(session) = self.sessions().get_mut(&id) {
            session.modified = false;
        }
    }

    pub fn close(&self, id: SessionId) -> Option<ClosedSession> {
        let session = self.sessions().remove(&id)?;
        log::debug!("closed session {id} on {}", session.path);
        Some(ClosedSession {
            path: session.path,
            unsaved: session.modified,
        })
    }

    pub fn open_on(&self, path: &RelativePath) -> usize {
        self.sessions()
            .values()
            .filter(|s| s.path == path)
            .count()
    }

    /// Delivers `notice` to every session on the same path except its origin.
    /// Returns how many sessions received it.
    pub fn broadcast(&self, notice: EditNotice) -> usize {
        let mut sessions = self.sessions();
        let mut delivered = 0;
        let mut gone = Vec::new();

        for (id, session) in sessions.iter() {
            if session.path != notice.path || Some(*id) == notice.origin {
                continue;
            }
            match session.sender.send(notice.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => gone.push(*id),
            }
        }
        for id in gone {
            log::debug!("session {id} went away; dropping it");
            sessions.remove(&id);
        }

        log::debug!("broadcast edit of {} to {delivered} session(s)", notice.path);
        delivered
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
