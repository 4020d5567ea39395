//! Backend response/chunk -> OpenAI response/chunk.
//!
//! The backend may omit fields OpenAI SDKs treat as required. Missing ids and
//! timestamps come from a [`ResponseContext`] created once per request, so
//! every chunk of a stream shares the same id and `created`.

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use super::openai::{
    ChatChoice, ChatCompletionChunk, ChatCompletionResponse, ChunkChoice, ChunkDelta,
    ResponseMessage, Role,
};
use super::TranslateError;
use crate::backend::types::{BackendChatResponse, BackendChunk};

/// Per-request values used when the backend omits them.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    pub id: String,
    pub created: u64,
    pub model: String,
}

impl ResponseContext {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
            created: unix_now(),
            model: model.into(),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Map a unary backend response.
pub fn from_backend(
    response: BackendChatResponse,
    ctx: &ResponseContext,
) -> Result<ChatCompletionResponse, TranslateError> {
    if response.choices.is_empty() {
        return Err(TranslateError::NoChoices);
    }

    let choices = response
        .choices
        .into_iter()
        .enumerate()
        .map(|(position, choice)| {
            let message = choice.message.unwrap_or_default();
            ChatChoice {
                index: choice.index.unwrap_or(position as u32),
                message: ResponseMessage {
                    role: Role::from_backend(message.role.as_deref()),
                    content: message.content,
                    tool_calls: message.tool_calls,
                    extra: message.extra,
                },
                finish_reason: choice.finish_reason,
                logprobs: choice.logprobs,
                extra: choice.extra,
            }
        })
        .collect();

    Ok(ChatCompletionResponse {
        id: response.id.unwrap_or_else(|| ctx.id.clone()),
        object: "chat.completion".to_string(),
        created: response.created.unwrap_or(ctx.created),
        model: response.model.unwrap_or_else(|| ctx.model.clone()),
        choices,
        usage: response.usage.unwrap_or_default(),
        system_fingerprint: response.system_fingerprint,
        extra: response.extra,
    })
}

/// Maps stream chunks one at a time, in order. Chunks are never merged and
/// fields without a typed slot pass through unchanged.
#[derive(Debug, Clone)]
pub struct ChunkTranslator {
    ctx: ResponseContext,
}

impl ChunkTranslator {
    pub fn new(ctx: ResponseContext) -> Self {
        Self { ctx }
    }

    pub fn translate(&self, chunk: BackendChunk) -> ChatCompletionChunk {
        let choices = chunk
            .choices
            .into_iter()
            .enumerate()
            .map(|(position, choice)| ChunkChoice {
                index: choice.index.unwrap_or(position as u32),
                delta: ChunkDelta {
                    role: choice
                        .delta
                        .role
                        .as_deref()
                        .map(|r| Role::from_backend(Some(r))),
                    content: choice.delta.content,
                    tool_calls: choice.delta.tool_calls,
                    extra: choice.delta.extra,
                },
                finish_reason: choice.finish_reason,
                logprobs: choice.logprobs,
                extra: choice.extra,
            })
            .collect();

        ChatCompletionChunk {
            id: chunk.id.unwrap_or_else(|| self.ctx.id.clone()),
            object: "chat.completion.chunk".to_string(),
            created: chunk.created.unwrap_or(self.ctx.created),
            model: chunk.model.unwrap_or_else(|| self.ctx.model.clone()),
            choices,
            usage: chunk.usage,
            extra: chunk.extra,
        }
    }
}
