//! Conversation layer for Docent.
//!
//! Provides the per-session memory store, the keyword context router, the
//! prompt components and answer generator seam, the conversation
//! orchestrator, and the process-wide session registry.

pub mod error;
pub mod generator;
pub mod memory;
pub mod orchestrator;
pub mod prompt;
pub mod router;
pub mod session;

pub use error::ChatError;
pub use generator::{AnswerGenerator, MockGenerator, OpenAiChatConfig, OpenAiChatGenerator};
pub use memory::MemoryStore;
pub use orchestrator::{ChatReply, ConversationOrchestrator};
pub use prompt::PromptComponents;
pub use router::ContextRouter;
pub use session::{ConversationContext, Session, SessionRegistry};
