//! In-process table of live sessions: at most one connection per user.

use dashmap::DashMap;
use std::sync::Arc;

use presence_protocol::close::{CLOSE_NORMAL, REASON_SESSION_REPLACED};

use super::{ConnectionHandle, ConnectionId};

/// Live binding between a user identity and one open connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub role: String,
    pub handle: ConnectionHandle,
}

/// Process-local session registry. Cloning shares the same table.
///
/// Each method is a single map operation, so no caller ever observes a
/// half-applied register/unregister. Nothing here is held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `session` under its user id, replacing any existing entry.
    ///
    /// A displaced connection is told to close with "session replaced" and is
    /// returned to the caller.
    pub fn register(&self, session: Session) -> Option<Session> {
        let user_id = session.user_id.clone();
        let new_id = session.handle.id();
        let displaced = self.sessions.insert(user_id.clone(), session);

        if let Some(old) = &displaced {
            if old.handle.id() != new_id {
                old.handle.close(CLOSE_NORMAL, REASON_SESSION_REPLACED);
                tracing::info!(
                    user_id = %user_id,
                    displaced = %old.handle.id(),
                    connection_id = %new_id,
                    "Session replaced by newer connection"
                );
            }
        }

        tracing::debug!(
            user_id = %user_id,
            connection_id = %new_id,
            online = self.sessions.len(),
            "Session registered"
        );
        displaced
    }

    /// Remove the entry for `user_id` only if it still belongs to `connection_id`.
    /// Returns whether anything was removed.
    pub fn unregister(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        let removed = self
            .sessions
            .remove_if(user_id, |_, session| session.handle.id() == connection_id)
            .is_some();

        if removed {
            tracing::debug!(user_id = %user_id, connection_id = %connection_id, "Session unregistered");
        } else {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Stale unregister ignored"
            );
        }
        removed
    }

    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.sessions.get(user_id).map(|s| s.handle.clone())
    }

    pub fn session(&self, user_id: &str) -> Option<Session> {
        self.sessions.get(user_id).map(|s| s.value().clone())
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    pub fn online_count(&self) -> usize {
        self.sessions.len()
    }

    /// Sorted ids of every user with a live session.
    pub fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        users.sort();
        users
    }

    /// Administrative drop: remove the session and close its connection with
    /// `reason`. Returns false if the user had no session.
    pub fn disconnect(&self, user_id: &str, code: u16, reason: &str) -> bool {
        match self.sessions.remove(user_id) {
            Some((_, session)) => {
                session.handle.close(code, reason);
                tracing::info!(
                    user_id = %user_id,
                    connection_id = %session.handle.id(),
                    reason = reason,
                    "Session force-closed"
                );
                true
            }
            None => false,
        }
    }
}
