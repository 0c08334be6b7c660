//! Session tracking and the abort contract.

pub mod remote;

use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{GateError, Result};

/// Tracks active executions so they can be aborted by session id.
///
/// Aborting an already-finished or nonexistent session is not an error;
/// the abort contract is idempotent.
#[derive(Debug, Default)]
pub struct SessionManager {
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an execution under a session id, yielding the token its
    /// process watches. A second registration under a still-active id is
    /// rejected: silently replacing the token would detach the running
    /// execution from the abort contract.
    pub fn register(&self, session_id: &str) -> Result<CancellationToken> {
        let mut active = self.active.lock().unwrap();
        if active.contains_key(session_id) {
            return Err(GateError::config(
                session_id,
                "session id is already active",
            ));
        }
        let token = CancellationToken::new();
        active.insert(session_id.to_string(), token.clone());
        debug!("Registered session '{}'", session_id);
        Ok(token)
    }

    /// Release a finished session. Unknown ids are ignored.
    pub fn complete(&self, session_id: &str) {
        if self.active.lock().unwrap().remove(session_id).is_some() {
            debug!("Completed session '{}'", session_id);
        }
    }

    /// Forcibly terminate the named session, or all active sessions when
    /// no id is given. Idempotent.
    pub fn abort(&self, session_id: Option<&str>) {
        let mut active = self.active.lock().unwrap();
        match session_id {
            Some(id) => {
                if let Some(token) = active.remove(id) {
                    token.cancel();
                    info!("Aborted session '{}'", id);
                }
            }
            None => {
                let count = active.len();
                for (_, token) in active.drain() {
                    token.cancel();
                }
                if count > 0 {
                    info!("Aborted {} active session(s)", count);
                }
            }
        }
    }

    /// Number of currently active sessions.
    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_abort() {
        let sessions = SessionManager::new();
        let token = sessions.register("run-1").unwrap();
        assert!(!token.is_cancelled());
        assert_eq!(sessions.active_count(), 1);

        sessions.abort(Some("run-1"));
        assert!(token.is_cancelled());
        assert_eq!(sessions.active_count(), 0);
    }

    #[test]
    fn test_abort_is_idempotent() {
        let sessions = SessionManager::new();
        sessions.register("run-1").unwrap();

        sessions.abort(Some("run-1"));
        // already aborted, nonexistent: both are no-ops, not errors
        sessions.abort(Some("run-1"));
        sessions.abort(Some("never-existed"));
        sessions.abort(None);
    }

    #[test]
    fn test_abort_all() {
        let sessions = SessionManager::new();
        let a = sessions.register("a").unwrap();
        let b = sessions.register("b").unwrap();

        sessions.abort(None);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert_eq!(sessions.active_count(), 0);
    }

    #[test]
    fn test_duplicate_active_session_rejected() {
        let sessions = SessionManager::new();
        sessions.register("run-1").unwrap();
        assert!(sessions.register("run-1").is_err());

        // after completion the id is reusable
        sessions.complete("run-1");
        assert!(sessions.register("run-1").is_ok());
    }
}
