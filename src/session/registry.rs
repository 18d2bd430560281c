use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::session::Session;

/// Owned collection of live sessions, consulted at shutdown to release their
/// forward mappings. The embedding application holds one and is responsible
/// for calling `cleanup_all` before exit; there is no implicit global list.
///
/// Append-only: entries are never removed or compacted during normal
/// operation, so the registry grows with the number of sessions created.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<Vec<Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: Arc<Session>) {
        if let Ok(mut guard) = self.sessions.lock() {
            guard.push(session);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every session's forward mappings, in registration order. A
    /// failing session (the device may already be gone by shutdown) is
    /// logged and skipped; the sweep always visits every entry.
    pub fn cleanup_all(&self) {
        let sessions: Vec<Arc<Session>> = match self.sessions.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        for session in sessions {
            if let Err(err) = session.remove_forward(None) {
                warn!(
                    trace_id = %session.trace_id(),
                    error = %err,
                    "forward cleanup failed, continuing with remaining sessions"
                );
            }
        }
    }
}
