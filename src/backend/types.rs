//! Gonka API wire types.
//!
//! Requests are serialized in declaration order, so the signed body bytes are
//! fully determined by the field values. Responses are parsed leniently: the
//! backend may omit fields OpenAI clients require, and the translator fills
//! them in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::translate::openai::{StopSequence, Usage};

/// Chat request body sent to `POST /chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendChatRequest {
    pub model: String,
    pub messages: Vec<BackendMessage>,
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Unary chat response.
///
/// Fields without a typed slot are kept in `extra` and re-emitted to the
/// client, so backend extensions such as `reasoning_content` survive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendChatResponse {
    pub id: Option<String>,
    /// Always rewritten to `chat.completion`.
    pub object: Option<String>,
    pub created: Option<u64>,
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<BackendChoice>,
    pub usage: Option<Usage>,
    pub system_fingerprint: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendChoice {
    pub index: Option<u32>,
    pub message: Option<BackendResponseMessage>,
    pub finish_reason: Option<String>,
    pub logprobs: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendResponseMessage {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One event of a streaming chat response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendChunk {
    pub id: Option<String>,
    /// Always rewritten to `chat.completion.chunk`.
    pub object: Option<String>,
    pub created: Option<u64>,
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<BackendChunkChoice>,
    pub usage: Option<Usage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BackendChunk {
    /// Whether any choice in this chunk carries a finish reason.
    pub fn is_final(&self) -> bool {
        self.choices.iter().any(|c| c.finish_reason.is_some())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendChunkChoice {
    pub index: Option<u32>,
    #[serde(default)]
    pub delta: BackendDelta,
    pub finish_reason: Option<String>,
    pub logprobs: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendDelta {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Option<Value>,
    /// e.g. `reasoning_content`, `refusal`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /models` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendModelList {
    #[serde(default)]
    pub models: Vec<Value>,
}
