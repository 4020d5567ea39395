//! gonka-gateway: OpenAI-compatible gateway for the Gonka API.
//!
//! Accepts OpenAI chat-completion traffic, signs each request with the
//! operator's secp256k1 key, and forwards it to a Gonka endpoint:
//!   client → auth gate → translator → signed backend call → translator → client
//!
//! Streaming responses are re-framed event by event without buffering.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod metrics;
pub mod server;
pub mod signer;
pub mod translate;
