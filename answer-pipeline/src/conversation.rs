use std::{collections::HashMap, sync::Arc};

use common::{
    error::AppError,
    storage::{
        store::DocumentStore,
        types::{document::DocumentId, message::ChatMessage},
    },
};
use ingestion_pipeline::utils::pdf::text_extraction::extract_text_async;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::{generator::TextGenerator, session::ChatSession};

/// Conversations bound to stored documents.
///
/// With persistence enabled the stored history is authoritative and every new
/// turn is appended to the record. Without it the caller carries the history
/// and nothing is written back.
///
/// Turns on one document run one at a time, from reading the history to
/// appending the reply, so each turn is answered against the turn before it.
pub struct DocumentChat {
    store: Arc<DocumentStore>,
    generator: Arc<dyn TextGenerator>,
    persist_history: bool,
    turn_locks: Mutex<HashMap<DocumentId, Arc<Mutex<()>>>>,
}

impl DocumentChat {
    pub fn new(
        store: Arc<DocumentStore>,
        generator: Arc<dyn TextGenerator>,
        persist_history: bool,
    ) -> Self {
        Self {
            store,
            generator,
            persist_history,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn persists_history(&self) -> bool {
        self.persist_history
    }

    /// The stored history; always empty when persistence is off.
    pub async fn history(&self, id: DocumentId) -> Result<Vec<ChatMessage>, AppError> {
        let document = self.store.get(id).await?;
        Ok(if self.persist_history {
            document.messages
        } else {
            Vec::new()
        })
    }

    /// Opens the conversation, summarizing the document when there is no
    /// history yet. Returns the whole transcript.
    pub async fn open(
        &self,
        id: DocumentId,
        supplied_history: Option<Vec<ChatMessage>>,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let _turn = self.lock_turns(id).await;
        let mut session = self.session(id, supplied_history).await?;
        let added = session.start().await;
        self.record(id, added).await?;
        Ok(session.into_messages())
    }

    /// Answers one user turn. Returns the turns added, which is empty for
    /// blank input.
    pub async fn send(
        &self,
        id: DocumentId,
        content: &str,
        supplied_history: Option<Vec<ChatMessage>>,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let _turn = self.lock_turns(id).await;
        let mut session = self.session(id, supplied_history).await?;
        let added = session.send(content).await;
        self.record(id, added.clone()).await?;
        Ok(added)
    }

    pub async fn clear(&self, id: DocumentId) -> Result<(), AppError> {
        let _turn = self.lock_turns(id).await;
        if self.persist_history {
            self.store.clear_messages(id).await
        } else {
            self.store.get_summary(id).await.map(|_| ())
        }
    }

    /// Nothing is shared between callers when history is not stored.
    async fn lock_turns(&self, id: DocumentId) -> Option<OwnedMutexGuard<()>> {
        if !self.persist_history {
            return None;
        }
        let lock = {
            let mut locks = self.turn_locks.lock().await;
            // Drop locks nobody else holds so the map tracks live conversations.
            locks.retain(|key, lock| *key == id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(id).or_default())
        };
        Some(lock.lock_owned().await)
    }

    async fn session(
        &self,
        id: DocumentId,
        supplied_history: Option<Vec<ChatMessage>>,
    ) -> Result<ChatSession, AppError> {
        let document = self.store.get(id).await?;
        let history = if self.persist_history {
            document.messages
        } else {
            supplied_history.unwrap_or_default()
        };

        let document_text = match extract_text_async(document.content).await {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    document_id = %id,
                    error = %err,
                    "No text layer; chatting without document text"
                );
                String::new()
            }
        };

        Ok(ChatSession::new(
            Arc::clone(&self.generator),
            document_text,
            history,
        ))
    }

    async fn record(&self, id: DocumentId, turns: Vec<ChatMessage>) -> Result<(), AppError> {
        if !self.persist_history || turns.is_empty() {
            return Ok(());
        }
        let count = turns.len();
        self.store.append_messages(id, turns).await?;
        info!(document_id = %id, count, "Recorded chat turns");
        Ok(())
    }
}
