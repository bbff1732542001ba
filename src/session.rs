//! Per-session bounded conversation windows.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::model::ChatMessage;

/// One user turn plus the assistant turn that answered it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// Lazily created, mutex-guarded session windows.
///
/// Each session keeps the last `max_exchanges` exchanges; appending beyond
/// capacity drops the oldest first. Unknown session ids render as empty
/// history, so callers may bring their own ids.
pub struct SessionStore {
    max_exchanges: usize,
    sessions: Mutex<HashMap<String, VecDeque<Exchange>>>,
}

impl SessionStore {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            max_exchanges,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a fresh opaque session id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.lock().insert(id.clone(), VecDeque::new());
        id
    }

    /// Append one exchange, evicting the oldest beyond capacity. The session
    /// is created on first use.
    pub fn record(&self, session_id: &str, user: impl Into<String>, assistant: impl Into<String>) {
        let mut sessions = self.sessions.lock();
        let window = sessions.entry(session_id.to_string()).or_default();
        window.push_back(Exchange {
            user: user.into(),
            assistant: assistant.into(),
        });
        while window.len() > self.max_exchanges {
            window.pop_front();
        }
    }

    /// Render a session as a flat, oldest-first alternating message sequence.
    pub fn render(&self, session_id: &str) -> Vec<ChatMessage> {
        let sessions = self.sessions.lock();
        let Some(window) = sessions.get(session_id) else {
            return Vec::new();
        };
        window
            .iter()
            .flat_map(|exchange| {
                [
                    ChatMessage::user(&exchange.user),
                    ChatMessage::assistant(&exchange.assistant),
                ]
            })
            .collect()
    }

    /// Number of retained exchanges for a session.
    pub fn exchange_count(&self, session_id: &str) -> usize {
        self.sessions
            .lock()
            .get(session_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_drops_oldest_first() {
        let store = SessionStore::new(2);
        let id = store.create();
        for i in 1..=5 {
            store.record(&id, format!("question {i}"), format!("answer {i}"));
        }
        assert_eq!(store.exchange_count(&id), 2);

        let rendered = store.render(&id);
        assert_eq!(rendered.len(), 4);
        assert_eq!(rendered[0].text(), "question 4");
        assert_eq!(rendered[1].text(), "answer 4");
        assert_eq!(rendered[2].text(), "question 5");
        assert_eq!(rendered[3].text(), "answer 5");
    }

    #[test]
    fn rendering_alternates_roles_oldest_first() {
        use crate::model::Role;
        let store = SessionStore::new(4);
        let id = store.create();
        store.record(&id, "first q", "first a");
        store.record(&id, "second q", "second a");

        let rendered = store.render(&id);
        let roles: Vec<Role> = rendered.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
        assert_eq!(rendered[0].text(), "first q");
    }

    #[test]
    fn unknown_session_renders_empty() {
        let store = SessionStore::new(2);
        assert!(store.render("nobody-home").is_empty());
        assert_eq!(store.exchange_count("nobody-home"), 0);
    }

    #[test]
    fn sessions_are_created_lazily_on_record() {
        let store = SessionStore::new(2);
        store.record("external-id", "q", "a");
        assert_eq!(store.exchange_count("external-id"), 1);
    }

    #[test]
    fn created_ids_are_unique() {
        let store = SessionStore::new(2);
        assert_ne!(store.create(), store.create());
    }
}
