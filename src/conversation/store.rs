//! In-memory session store, keyed by session id.
//!
//! Each session sits behind its own `Mutex`, held for the whole turn, so two
//! messages for the same session run one after the other. The outer map lock
//! is only held long enough to find or insert an entry, so different sessions
//! never wait on each other's completion calls. Sessions live until `reset`
//! or process exit.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::SessionError;

use super::machine::{ConversationEngine, TurnOutcome};
use super::state::{SessionSnapshot, SessionState};

type SessionHandle = Arc<Mutex<SessionState>>;

pub struct SessionStore {
    engine: ConversationEngine,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new(engine: ConversationEngine) -> Arc<Self> {
        Arc::new(Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    async fn handle(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(session_id.to_string()).or_insert_with(|| {
            info!(session_id, "Session created");
            Arc::new(Mutex::new(SessionState::new(session_id)))
        });
        Arc::clone(handle)
    }

    /// Return the session's state, creating a fresh one if needed.
    pub async fn get_or_create(&self, session_id: &str) -> SessionState {
        let handle = self.handle(session_id).await;
        let state = handle.lock().await;
        state.clone()
    }

    /// Run one conversation turn for `session_id`.
    pub async fn advance(
        &self,
        session_id: &str,
        message: &str,
    ) -> TurnOutcome {
        let handle = self.handle(session_id).await;
        let mut state = handle.lock().await;
        debug!(session_id, step = %state.step, "Advancing session");
        self.engine.run_turn(&mut state, message).await
    }

    /// Remove a session. Idempotent.
    pub async fn reset(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            info!(session_id, "Session reset");
        }
        removed
    }

    pub async fn get(&self, session_id: &str) -> Result<SessionSnapshot, SessionError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound {
                id: session_id.to_string(),
            })?;
        let state = handle.lock().await;
        Ok(state.snapshot())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::config::{ConversationConfig, LlmSettings};
    use crate::conversation::state::Step;
    use crate::conversation::testing::ScriptedLlm;
    use crate::error::LlmError;
    use crate::llm::{
        CompletionClient, CompletionRequest, CompletionResponse, LlmProvider,
    };

    fn store_with(provider: Option<Arc<dyn LlmProvider>>) -> Arc<SessionStore> {
        SessionStore::new(ConversationEngine::new(
            CompletionClient::new(provider, &LlmSettings::default()),
            ConversationConfig::default(),
        ))
    }

    #[tokio::test]
    async fn get_or_create_starts_at_greeting() {
        let store = store_with(None);
        let state = store.get_or_create("abc").await;
        assert_eq!(state.step, Step::Greeting);
        assert_eq!(store.len().await, 1);

        // A second call returns the same session rather than a new one.
        store.get_or_create("abc").await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let store = store_with(None);
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn blank_message_runs_a_normal_turn() {
        let llm = Arc::new(ScriptedLlm::new(["Hi there!"]));
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let store = store_with(Some(provider));
        assert!(store.is_empty().await);

        let outcome = store.advance("abc", "   ").await;
        assert_eq!(outcome.response, "Hi there!");
        assert_eq!(outcome.step, Step::CollectInterests);
        let snapshot = store.get("abc").await.unwrap();
        assert_eq!(snapshot.conversation_history[0].content, "   ");
        assert!(llm.prompts()[0].contains("\"   \""));
    }

    #[tokio::test]
    async fn reset_removes_and_restarts() {
        let llm = Arc::new(ScriptedLlm::new(["Welcome!", "Welcome back!"]));
        let store = store_with(Some(llm));

        store.advance("abc", "hi").await;
        assert_eq!(store.get("abc").await.unwrap().current_step, Step::CollectInterests);

        assert!(store.reset("abc").await);
        assert!(!store.reset("abc").await, "reset is idempotent");
        assert!(store.get("abc").await.is_err());

        let outcome = store.advance("abc", "hi again").await;
        assert_eq!(outcome.response, "Welcome back!");
        let snapshot = store.get("abc").await.unwrap();
        assert_eq!(snapshot.conversation_length, 2);
    }

    /// Answers every prompt after a delay. Each interests extraction yields
    /// a new interest, so turns racing on stale state would collect more
    /// than the threshold.
    struct SlowLlm {
        counter: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for SlowLlm {
        fn model_name(&self) -> &str {
            "slow"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let prompt = &request.prompt;
            let n = self
                .counter
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let content = if prompt.contains("Extract a concise list of user interests") {
                format!(r#"["interest {n}"]"#)
            } else {
                "ok".to_string()
            };
            Ok(CompletionResponse {
                content,
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_session_are_serialized() {
        let store = store_with(Some(Arc::new(SlowLlm {
            counter: Default::default(),
        })));
        let greeting = store.advance("abc", "hi").await;
        assert_eq!(greeting.step, Step::CollectInterests);

        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.advance("abc", &format!("message {i}")).await
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = store.get("abc").await.unwrap();
        assert_eq!(snapshot.conversation_length, 2 * 9);
        // Every turn ran against the latest state: the step left the loop
        // as soon as two interests were known and later turns extracted
        // nothing further.
        assert_eq!(snapshot.interests.len(), 2);
        assert_eq!(snapshot.current_step, Step::Followup);
    }

    #[tokio::test]
    async fn different_sessions_do_not_share_state() {
        let llm = Arc::new(ScriptedLlm::new(["a", "b"]));
        let store = store_with(Some(llm));
        store.advance("one", "hi").await;
        store.advance("two", "hello").await;

        let one = store.get("one").await.unwrap();
        let two = store.get("two").await.unwrap();
        assert_eq!(one.conversation_history[0].content, "hi");
        assert_eq!(two.conversation_history[0].content, "hello");
        assert_eq!(store.len().await, 2);
    }
}
