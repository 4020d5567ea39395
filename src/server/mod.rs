//! HTTP server providing the OpenAI-compatible API.
//!
//! - [`openai_api`]: routes, handlers and shared state
//! - [`streaming`]: SSE re-framing of backend streams
//! - [`auth`]: API-key gate
//! - [`error`]: OpenAI-shaped error responses
//! - [`bootstrap`]: startup sequence and server loop

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod openai_api;
pub mod streaming;

pub use bootstrap::{bootstrap, serve};
pub use openai_api::{build_router, AppState};
