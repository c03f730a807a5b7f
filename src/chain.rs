//! Conversational retrieval chain: condense the question, retrieve context,
//! stream the answer.

use crate::error::{Error, Result};
use crate::llm::{ChatMessage, ChatModel, Role, TokenStream};
use crate::vector_store::{MemoryIndex, SearchHit};

pub const CONDENSE_QUESTION_TEMPLATE: &str = "Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.

<chat_history>
  {chat_history}
</chat_history>

Follow Up Input: {question}
Standalone question:";

pub const ANSWER_TEMPLATE: &str = "You are an assistant helping to hire a candidate.
If the user says hello, you should say hello back. You can have a small talk about anything.
Only if asked about candidates, answer the question you are asked, based on the following context and chat history:
<context>
  {context}
</context>

<chat_history>
  {chat_history}
</chat_history>

Question: {question}

";

/// Fill `{name}` placeholders in one pass.
///
/// Unknown placeholders stay as written, and substituted values are never
/// scanned again.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render prior turns as `Human:` / `Assistant:` lines.
pub fn format_chat_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| match m.role {
            Role::User => format!("Human: {}", m.content),
            Role::Assistant => format!("Assistant: {}", m.content),
            other => format!("{}: {}", other.as_str(), m.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn combine_documents(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| h.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct ConversationalChain<'a> {
    model: &'a dyn ChatModel,
    index: &'a MemoryIndex,
    top_k: usize,
}

impl<'a> ConversationalChain<'a> {
    pub fn new(model: &'a dyn ChatModel, index: &'a MemoryIndex, top_k: usize) -> Self {
        Self { model, index, top_k }
    }

    /// Rewrite the latest question so it stands without the conversation.
    pub async fn condense_question(&self, chat_history: &str, question: &str) -> Result<String> {
        let prompt = render_template(
            CONDENSE_QUESTION_TEMPLATE,
            &[("chat_history", chat_history), ("question", question)],
        );
        let standalone = self.model.complete(&[ChatMessage::user(prompt)]).await?;
        Ok(standalone.trim().to_string())
    }

    pub async fn retrieve_context(&self, question: &str) -> Result<String> {
        let hits = self.index.similarity_search(question, self.top_k).await?;
        tracing::debug!("Retrieved {} chunks", hits.len());
        Ok(combine_documents(&hits))
    }

    pub async fn answer(
        &self,
        context: &str,
        chat_history: &str,
        question: &str,
    ) -> Result<TokenStream> {
        let prompt = render_template(
            ANSWER_TEMPLATE,
            &[
                ("context", context),
                ("chat_history", chat_history),
                ("question", question),
            ],
        );
        Ok(self.model.stream(&[ChatMessage::user(prompt)]).await?)
    }

    /// Run all three stages for a transcript whose last message is the
    /// current question.
    pub async fn stream(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        let (current, previous) = messages
            .split_last()
            .ok_or_else(|| Error::bad_request("no messages to answer"))?;
        let chat_history = format_chat_history(previous);

        let question = self.condense_question(&chat_history, &current.content).await?;
        tracing::debug!("Standalone question: {}", question);
        let context = self.retrieve_context(&question).await?;
        self.answer(&context, &chat_history, &question).await
    }
}
