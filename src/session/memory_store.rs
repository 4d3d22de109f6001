//! In-memory session storage.
//!
//! Sessions are lost when the process restarts.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use time::{Duration, OffsetDateTime};

use super::SessionHandle;
use crate::error::Error;
use crate::middleware::SessionStore;
use crate::types::SessionId;

struct Entry {
    handle: SessionHandle,
    last_seen: OffsetDateTime,
}

/// Sessions in a `HashMap` behind a `RwLock`, keyed by session ID.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Entry>>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().map(|guard| guard.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions not seen for longer than `max_idle`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] if the lock is poisoned.
    pub fn prune_idle(&self, max_idle: Duration) -> Result<usize, Error> {
        let mut sessions = self.write()?;
        let cutoff = OffsetDateTime::now_utc() - max_idle;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen > cutoff);
        Ok(before.saturating_sub(sessions.len()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<SessionId, Entry>>, Error> {
        self.sessions
            .write()
            .map_err(|_| Error::Session("Lock poisoned".to_owned()))
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("sessions", &self.len())
            .finish()
    }
}

impl SessionStore for MemorySessionStore {
    async fn create(&self) -> Result<(SessionId, SessionHandle), Error> {
        let session_id = SessionId::generate();
        let handle = SessionHandle::default();

        self.write()?.insert(
            session_id.clone(),
            Entry {
                handle: handle.clone(),
                last_seen: OffsetDateTime::now_utc(),
            },
        );

        Ok((session_id, handle))
    }

    async fn find(&self, session_id: &SessionId) -> Result<Option<SessionHandle>, Error> {
        let mut sessions = self.write()?;
        Ok(sessions.get_mut(session_id).map(|entry| {
            entry.last_seen = OffsetDateTime::now_utc();
            entry.handle.clone()
        }))
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), Error> {
        self.write()?.remove(session_id);
        Ok(())
    }
}
