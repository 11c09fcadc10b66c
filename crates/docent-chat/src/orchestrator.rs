//! Conversation orchestrator: validates a message, routes it to a context,
//! builds the prompt, calls the answer generator, and records the exchange.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use docent_core::config::ChatConfig;
use docent_core::error::DocentError;
use docent_core::types::{ContextKind, Turn};

use crate::error::ChatError;
use crate::generator::AnswerGenerator;
use crate::memory::MemoryStore;
use crate::prompt::PromptComponents;
use crate::router::ContextRouter;
use crate::session::{ConversationContext, Session};

/// Result of one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub target: ContextKind,
    /// The session's full conversation log after this turn.
    pub messages: Vec<Turn>,
}

/// Coordinates routing, retrieval, and generation for chat turns.
pub struct ConversationOrchestrator {
    router: ContextRouter,
    generator: Arc<dyn AnswerGenerator>,
    memory_window: usize,
    retrieval_k: usize,
    max_message_length: usize,
    fallback_reply: String,
}

impl ConversationOrchestrator {
    pub fn new(config: &ChatConfig, generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            router: ContextRouter::new(&config.document_keywords),
            generator,
            memory_window: config.memory_window,
            retrieval_k: config.retrieval_k,
            max_message_length: config.max_message_length,
            fallback_reply: config.fallback_reply.clone(),
        }
    }

    pub fn router(&self) -> &ContextRouter {
        &self.router
    }

    pub fn fallback_reply(&self) -> &str {
        &self.fallback_reply
    }

    /// Handle one incoming chat message for a session.
    ///
    /// Rejects blank or over-long messages and messages that arrive while
    /// the session's document is processing; rejections record nothing.
    /// Otherwise the message is routed and answered, and generator failures
    /// turn into the fallback reply.
    pub async fn chat(&self, session: &Session, message: &str) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }

        let mut memory = session.lock_memory().await;

        let (status, index) = session.document().snapshot();
        if status.is_processing() {
            debug!(session_id = %session.id(), "Chat rejected while document is processing");
            return Err(ChatError::StillProcessing);
        }

        let target = self.router.route(message, &status, index.is_some());
        let context = match (target, index) {
            (ContextKind::Document, Some(index)) => ConversationContext::Document(index),
            _ => ConversationContext::General,
        };

        let response = self.answer_with(&mut memory, context, message).await;
        info!(
            session_id = %session.id(),
            target = ?target,
            turns = memory.len(),
            "Chat turn completed"
        );

        Ok(ChatReply {
            response,
            target,
            messages: memory.turns().to_vec(),
        })
    }

    /// Answer `message` in the given context without routing.
    ///
    /// A `Document` target on a session without a document index is
    /// answered in the general context.
    pub async fn answer(&self, session: &Session, target: ContextKind, message: &str) -> String {
        let mut memory = session.lock_memory().await;
        let context = session.context(target).unwrap_or_else(|| {
            warn!(
                session_id = %session.id(),
                "Document context requested without an index; answering generally"
            );
            ConversationContext::General
        });
        self.answer_with(&mut memory, context, message).await
    }

    async fn answer_with(
        &self,
        memory: &mut MemoryStore,
        context: ConversationContext,
        message: &str,
    ) -> String {
        memory.append(Turn::user(message));
        let history = memory.window(self.memory_window);

        let answer = match self.generate(context, history, message).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Answer generation failed; using fallback reply");
                self.fallback_reply.clone()
            }
        };

        memory.append(Turn::assistant(answer.clone()));
        answer
    }

    async fn generate(
        &self,
        context: ConversationContext,
        history: Vec<Turn>,
        message: &str,
    ) -> Result<String, DocentError> {
        let prompt = match context {
            ConversationContext::General => PromptComponents::general(history, message),
            ConversationContext::Document(index) => {
                let chunks = index.query(message, self.retrieval_k).await?;
                debug!(retrieved = chunks.len(), "Passages retrieved for document turn");
                PromptComponents::document(&chunks, history, message)
            }
        };
        self.generator.generate(&prompt).await
    }
}

// =============================================================================
// Tests
// =============================================================================
