use std::future::Future;

use crate::error::Error;
use crate::session::SessionHandle;
use crate::types::SessionId;

/// Session persistence.
///
/// A store hands out shared [`SessionHandle`]s so every request of the same
/// browser session locks the same state.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for MyStore {
///     async fn create(&self) -> Result<(SessionId, SessionHandle), Error> {
///         let id = SessionId::generate();
///         let handle = SessionHandle::default();
///         self.map.lock().await.insert(id.clone(), handle.clone());
///         Ok((id, handle))
///     }
///     // ...
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Create an empty session.
    fn create(&self) -> impl Future<Output = Result<(SessionId, SessionHandle), Error>> + Send;

    /// Look up a session by ID.
    fn find(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<SessionHandle>, Error>> + Send;

    /// Delete a session (logout).
    fn delete(&self, session_id: &SessionId) -> impl Future<Output = Result<(), Error>> + Send;
}
