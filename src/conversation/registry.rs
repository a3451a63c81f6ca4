// Named conversation sessions owned by the host
//
// Features look sessions up by name. The registry is an ordinary value the
// host creates and holds, so separate hosts (and tests) never share sessions.

use super::{ConversationSession, SessionSettings};
use crate::host::Notifier;
use crate::provider::ModelProvider;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct SessionRegistry {
    provider: Arc<dyn ModelProvider>,
    settings: SessionSettings,
    notifier: Arc<dyn Notifier>,
    sessions: Mutex<HashMap<String, Arc<ConversationSession>>>,
}

impl SessionRegistry {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        settings: SessionSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            provider,
            settings,
            notifier,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<ConversationSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session called `name`, created on first use
    ///
    /// `context` becomes the session's system context either way.
    pub fn session(&self, name: &str, context: &str) -> Arc<ConversationSession> {
        let session = Arc::clone(self.lock().entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(session = name, "Creating conversation session");
            Arc::new(ConversationSession::new(
                name,
                Arc::clone(&self.provider),
                self.settings.clone(),
                Arc::clone(&self.notifier),
            ))
        }));
        session.set_context(context);
        session
    }

    pub fn get(&self, name: &str) -> Option<Arc<ConversationSession>> {
        self.lock().get(name).cloned()
    }

    /// Disconnect and forget a session
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.lock().remove(name);
        match removed {
            Some(session) => {
                session.disconnect();
                true
            }
            None => false,
        }
    }

    pub fn disconnect_all(&self) {
        let sessions: Vec<_> = self.lock().values().cloned().collect();
        for session in sessions {
            session.disconnect();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingNotifier, ScriptedProvider};

    fn registry(provider: &Arc<ScriptedProvider>) -> SessionRegistry {
        SessionRegistry::new(
            provider.clone(),
            SessionSettings::default(),
            Arc::new(RecordingNotifier::default()),
        )
    }

    #[test]
    fn test_same_name_returns_same_session() {
        let provider = Arc::new(ScriptedProvider::new());
        let registry = registry(&provider);

        let a = registry.session("note-chat", "context one");
        let b = registry.session("note-chat", "context two");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.system_context(), "context two");
        assert_eq!(registry.len(), 1);

        registry.session("other", "");
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_disconnects() {
        let provider = Arc::new(ScriptedProvider::new());
        let registry = registry(&provider);
        let session = registry.session("s", "ctx");
        session.connect().await.unwrap();

        assert!(registry.remove("s"));
        assert!(!session.is_connected());
        assert!(registry.get("s").is_none());
        assert!(!registry.remove("s"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_registries_are_isolated() {
        let provider = Arc::new(ScriptedProvider::new());
        let first = registry(&provider);
        let second = registry(&provider);
        first.session("shared-name", "");
        assert!(second.get("shared-name").is_none());

        first.session("shared-name", "").connect().await.unwrap();
        first.disconnect_all();
        assert!(!first.session("shared-name", "").is_connected());
    }
}
