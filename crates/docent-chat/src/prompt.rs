//! Prompt components handed to the answer generator.

use serde::Serialize;

use docent_core::types::{ContextKind, DocumentChunk, Role, Turn};

/// Instructions for turns answered from the conversation alone.
pub const GENERAL_INSTRUCTIONS: &str = "\
You are a helpful AI assistant. Remember and recall personal information the user shares \
during the conversation.

- When the user says \"my name is X\" or \"I am X\", remember X as their name.
- When the user says \"my age is X\" or \"I am X years old\", remember X as their age.
- Remember any other personal information they share.
- When asked about previously shared information, recall it from the conversation history.
- Acknowledge when you have recorded new personal information.
- If unsure, politely ask for clarification.
- Keep answers simple and concise.";

/// Instructions for turns grounded in the uploaded document.
pub const DOCUMENT_INSTRUCTIONS: &str = "\
You are a helpful AI assistant with two jobs:
1. Answer questions about the uploaded PDF using the provided context.
2. Remember and recall personal information shared during the conversation.

- If the question is about the PDF content, answer from the context provided.
- If it is a statement sharing personal information, acknowledge it.
- If it asks about previously shared personal information, check the conversation history.
- Keep personal information consistent throughout the conversation.
- If the context does not contain the answer, say so rather than guessing.
- Keep answers simple and concise.";

/// Everything the generator needs for one answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptComponents {
    pub kind: ContextKind,
    pub instructions: String,
    /// Retrieved passages, most relevant first. Empty for general turns.
    pub passages: Vec<String>,
    /// Recent turns, earliest first. The last turn is the current question.
    pub history: Vec<Turn>,
    pub question: String,
}

impl PromptComponents {
    /// Components for a general turn: history and question only.
    pub fn general(history: Vec<Turn>, question: impl Into<String>) -> Self {
        Self {
            kind: ContextKind::General,
            instructions: GENERAL_INSTRUCTIONS.to_string(),
            passages: Vec::new(),
            history,
            question: question.into(),
        }
    }

    /// Components for a document turn: retrieved chunks, history, question.
    pub fn document(
        chunks: &[DocumentChunk],
        history: Vec<Turn>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            kind: ContextKind::Document,
            instructions: DOCUMENT_INSTRUCTIONS.to_string(),
            passages: chunks.iter().map(|c| c.text.clone()).collect(),
            history,
            question: question.into(),
        }
    }

    /// System message: instructions, plus the passages for document turns.
    pub fn system_message(&self) -> String {
        if self.kind == ContextKind::General {
            return self.instructions.clone();
        }
        let context = if self.passages.is_empty() {
            "(no matching passages)".to_string()
        } else {
            self.passages.join("\n\n---\n\n")
        };
        format!("{}\n\nContext from PDF:\n{}", self.instructions, context)
    }

    /// History as `Human:` / `Assistant:` lines.
    pub fn history_transcript(&self) -> String {
        self.history
            .iter()
            .map(|turn| match turn.role {
                Role::User => format!("Human: {}", turn.content),
                Role::Assistant => format!("Assistant: {}", turn.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Chat-completions style messages: the system message, the history,
    /// and the question unless the history already ends with it.
    pub fn to_messages(&self) -> Vec<serde_json::Value> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(serde_json::json!({
            "role": "system",
            "content": self.system_message(),
        }));
        for turn in &self.history {
            messages.push(serde_json::json!({
                "role": turn.role.as_str(),
                "content": turn.content,
            }));
        }
        let ends_with_question = self
            .history
            .last()
            .map(|t| t.role == Role::User && t.content == self.question)
            .unwrap_or(false);
        if !ends_with_question {
            messages.push(serde_json::json!({
                "role": "user",
                "content": self.question,
            }));
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> DocumentChunk {
        DocumentChunk::new(text, serde_json::json!({"page": 1}))
    }

    #[test]
    fn test_general_prompt_has_no_passages() {
        let prompt = PromptComponents::general(vec![Turn::user("hi")], "hi");
        assert_eq!(prompt.kind, ContextKind::General);
        assert!(prompt.passages.is_empty());
        assert!(!prompt.system_message().contains("Context from PDF"));
    }

    #[test]
    fn test_document_prompt_includes_passages() {
        let prompt = PromptComponents::document(
            &[chunk("first passage"), chunk("second passage")],
            vec![Turn::user("what is in the document?")],
            "what is in the document?",
        );
        let system = prompt.system_message();
        assert!(system.starts_with(DOCUMENT_INSTRUCTIONS));
        assert!(system.contains("first passage"));
        assert!(system.find("first passage") < system.find("second passage"));
    }

    #[test]
    fn test_document_prompt_without_passages() {
        let prompt = PromptComponents::document(&[], Vec::new(), "what does the file say?");
        assert!(prompt.system_message().contains("(no matching passages)"));
    }

    #[test]
    fn test_history_transcript_labels_roles() {
        let prompt = PromptComponents::general(
            vec![
                Turn::user("My name is Ada"),
                Turn::assistant("Nice to meet you, Ada."),
                Turn::user("What is my name?"),
            ],
            "What is my name?",
        );
        assert_eq!(
            prompt.history_transcript(),
            "Human: My name is Ada\nAssistant: Nice to meet you, Ada.\nHuman: What is my name?"
        );
    }

    #[test]
    fn test_messages_do_not_repeat_trailing_question() {
        let prompt = PromptComponents::general(
            vec![Turn::user("earlier"), Turn::assistant("ok"), Turn::user("now?")],
            "now?",
        );
        let messages = prompt.to_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "now?");
    }

    #[test]
    fn test_messages_append_question_when_missing_from_history() {
        let prompt = PromptComponents::general(Vec::new(), "standalone");
        let messages = prompt.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["content"], "standalone");
    }
}
