//! Translation between the OpenAI chat schema and the Gonka API schema.
//!
//! - [`openai`]: client-facing request/response/chunk types
//! - [`request`]: OpenAI request -> backend request
//! - [`response`]: backend response/chunk -> OpenAI response/chunk

pub mod openai;
pub mod request;
pub mod response;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("`model` must not be empty")]
    MissingModel,

    #[error("`messages` must contain at least one message")]
    EmptyMessages,

    #[error("backend response contained no choices")]
    NoChoices,
}
