//! OpenAI request -> backend request.

use super::openai::{ChatCompletionRequest, ChatMessage, Role};
use super::TranslateError;
use crate::backend::types::{BackendChatRequest, BackendMessage};

/// Reject requests that can never succeed before any backend work is done.
pub fn validate(request: &ChatCompletionRequest) -> Result<(), TranslateError> {
    if request.model.trim().is_empty() {
        return Err(TranslateError::MissingModel);
    }
    if request.messages.is_empty() {
        return Err(TranslateError::EmptyMessages);
    }
    Ok(())
}

/// Map a client request onto the backend body.
///
/// `max_completion_tokens` is folded into `max_tokens` when the latter is
/// absent, and `developer` messages are sent as `system`.
pub fn to_backend(request: ChatCompletionRequest) -> BackendChatRequest {
    let stream = request.is_stream();
    BackendChatRequest {
        model: request.model,
        messages: request.messages.into_iter().map(to_backend_message).collect(),
        stream,
        temperature: request.temperature,
        top_p: request.top_p,
        n: request.n,
        stop: request.stop,
        max_tokens: request.max_tokens.or(request.max_completion_tokens),
        presence_penalty: request.presence_penalty,
        frequency_penalty: request.frequency_penalty,
        seed: request.seed,
        user: request.user,
        logprobs: request.logprobs,
        top_logprobs: request.top_logprobs,
        tools: request.tools,
        tool_choice: request.tool_choice,
        response_format: request.response_format,
        stream_options: request.stream_options,
    }
}

fn to_backend_message(message: ChatMessage) -> BackendMessage {
    let role = match message.role {
        Role::Developer => Role::System,
        other => other,
    };
    BackendMessage {
        role: role.as_str().to_string(),
        content: message.content,
        name: message.name,
        tool_calls: message.tool_calls,
        tool_call_id: message.tool_call_id,
    }
}
