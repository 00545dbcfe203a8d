//! Session Slot
//!
//! Holds at most one live session. Every access names the session it expects;
//! if a newer session has taken the slot, or the slot is empty, the access is
//! a no-op. This is what keeps a late callback from touching a session it
//! does not belong to.
//!
//! The lock is never held across a transport call.

use tokio::sync::Mutex;

use super::{Session, SessionId};

#[derive(Debug, Default)]
pub struct SessionSlot {
    current: Mutex<Option<Session>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `session` in the slot, returning whatever it displaced.
    pub async fn install(&self, session: Session) -> Option<Session> {
        let previous = self.current.lock().await.replace(session);
        if let Some(ref old) = previous {
            tracing::debug!(session_id = %old.id, "Displaced session from slot");
        }
        previous
    }

    /// Copy of the live session, if any.
    pub async fn snapshot(&self) -> Option<Session> {
        self.current.lock().await.clone()
    }

    /// Id of the live session, if any.
    pub async fn current_id(&self) -> Option<SessionId> {
        self.current.lock().await.as_ref().map(|s| s.id)
    }

    /// Whether `id` is the live session.
    pub async fn is_current(&self, id: SessionId) -> bool {
        self.current_id().await == Some(id)
    }

    /// Run `f` against the session if `id` is still live.
    pub async fn with_session<R>(&self, id: SessionId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut guard = self.current.lock().await;
        match guard.as_mut() {
            Some(session) if session.id == id => Some(f(session)),
            _ => None,
        }
    }

    /// Take the session out of the slot if `id` is still live.
    pub async fn remove(&self, id: SessionId) -> Option<Session> {
        let mut guard = self.current.lock().await;
        if guard.as_ref().is_some_and(|s| s.id == id) {
            guard.take()
        } else {
            None
        }
    }

    /// Empty the slot regardless of which session holds it.
    pub async fn clear(&self) -> Option<Session> {
        self.current.lock().await.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Phase;

    fn id(n: u64) -> SessionId {
        SessionId::from_raw(n)
    }

    #[tokio::test]
    async fn test_install_displaces() {
        let slot = SessionSlot::new();
        assert!(slot.install(Session::read(id(1), "one")).await.is_none());

        let displaced = slot.install(Session::read(id(2), "two")).await.unwrap();
        assert_eq!(displaced.id, id(1));
        assert_eq!(slot.current_id().await, Some(id(2)));
    }

    #[tokio::test]
    async fn test_stale_access_is_ignored() {
        let slot = SessionSlot::new();
        slot.install(Session::read(id(2), "two")).await;

        let touched = slot
            .with_session(id(1), |s| s.advance(Phase::AwaitingTag))
            .await;
        assert!(touched.is_none());
        assert_eq!(slot.snapshot().await.unwrap().phase, Phase::Activating);

        assert!(slot.remove(id(1)).await.is_none());
        assert!(slot.is_current(id(2)).await);
    }

    #[tokio::test]
    async fn test_remove_current() {
        let slot = SessionSlot::new();
        slot.install(Session::write(id(3), "hi", "writing")).await;

        let removed = slot.remove(id(3)).await.unwrap();
        assert_eq!(removed.pending_outgoing_text.as_deref(), Some("hi"));
        assert!(slot.current_id().await.is_none());
    }
}
