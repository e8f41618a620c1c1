use dashmap::DashMap;
use serde_json::Value;
use std::time::Instant;

pub struct McpSession {
    pub protocol_version: String,
    pub client_info: Option<Value>,
    /// Set once the client sent `notifications/initialized`.
    pub initialized: bool,
    pub created_at: Instant,
    pub last_activity: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unknown,
    AwaitingInitialized,
    Ready,
}

/// Server-side table of sessions keyed by the `mcp-session-id` header.
#[derive(Default)]
pub struct SessionManager {
    sessions: DashMap<String, McpSession>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session, returning the session ID.
    pub fn create_session(&self, protocol_version: String, client_info: Option<Value>) -> String {
        let session_id = nanoid::nanoid!(32);
        let now = Instant::now();
        self.sessions.insert(
            session_id.clone(),
            McpSession {
                protocol_version,
                client_info,
                initialized: false,
                created_at: now,
                last_activity: now,
            },
        );
        session_id
    }

    pub fn get_session(
        &self,
        session_id: &str,
    ) -> Option<dashmap::mapref::one::Ref<'_, String, McpSession>> {
        self.sessions.get(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn status(&self, session_id: &str) -> SessionStatus {
        match self.sessions.get(session_id) {
            None => SessionStatus::Unknown,
            Some(s) if s.initialized => SessionStatus::Ready,
            Some(_) => SessionStatus::AwaitingInitialized,
        }
    }

    /// Mark a session as initialized. Returns true if session existed.
    pub fn mark_initialized(&self, session_id: &str) -> bool {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.initialized = true;
            session.last_activity = Instant::now();
            true
        } else {
            false
        }
    }

    /// Record activity on a session. Returns true if session existed.
    pub fn touch(&self, session_id: &str) -> bool {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.last_activity = Instant::now();
            true
        } else {
            false
        }
    }

    /// Remove a session, handing it back if it existed.
    pub fn remove_session(&self, session_id: &str) -> Option<McpSession> {
        self.sessions.remove(session_id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_session_returns_32_char_id() {
        let mgr = SessionManager::new();
        let id = mgr.create_session("2025-03-26".into(), None);
        assert_eq!(id.len(), 32);
    }

    #[test]
    fn two_sessions_have_different_ids() {
        let mgr = SessionManager::new();
        let id1 = mgr.create_session("2025-03-26".into(), None);
        let id2 = mgr.create_session("2025-03-26".into(), None);
        assert_ne!(id1, id2);
        assert_eq!(mgr.len(), 2);
    }

    #[test]
    fn new_session_awaits_initialized_notification() {
        let mgr = SessionManager::new();
        let id = mgr.create_session("2025-03-26".into(), Some(json!({"name": "python"})));
        let session = mgr.get_session(&id).expect("session should exist");
        assert_eq!(session.protocol_version, "2025-03-26");
        assert_eq!(session.client_info.as_ref().unwrap()["name"], "python");
        drop(session);
        assert_eq!(mgr.status(&id), SessionStatus::AwaitingInitialized);
    }

    #[test]
    fn mark_initialized_makes_session_ready() {
        let mgr = SessionManager::new();
        let id = mgr.create_session("2025-03-26".into(), None);
        assert!(mgr.mark_initialized(&id));
        assert_eq!(mgr.status(&id), SessionStatus::Ready);
    }

    #[test]
    fn unknown_ids() {
        let mgr = SessionManager::new();
        assert_eq!(mgr.status("nonexistent"), SessionStatus::Unknown);
        assert!(!mgr.mark_initialized("nonexistent"));
        assert!(!mgr.touch("nonexistent"));
        assert!(mgr.remove_session("nonexistent").is_none());
    }

    #[test]
    fn touch_advances_last_activity() {
        let mgr = SessionManager::new();
        let id = mgr.create_session("2025-03-26".into(), None);
        let before = mgr.get_session(&id).unwrap().last_activity;
        assert!(mgr.touch(&id));
        assert!(mgr.get_session(&id).unwrap().last_activity >= before);
    }

    #[test]
    fn remove_session_makes_it_inaccessible() {
        let mgr = SessionManager::new();
        let id = mgr.create_session("2025-03-26".into(), None);
        let removed = mgr.remove_session(&id).expect("session existed");
        assert_eq!(removed.protocol_version, "2025-03-26");
        assert!(removed.created_at <= removed.last_activity);
        assert!(!mgr.contains(&id));
        assert!(mgr.is_empty());
    }
}
