//! Request signing for the Gonka API.
//!
//! Every outbound backend call carries a signature proving it was issued by
//! the holder of the operator's secp256k1 key:
//! - [`keys`]: private key and bech32 address parsing, validated at startup
//! - [`signature`]: the signing function, hybrid clock and signed request type

pub mod keys;
pub mod signature;

use thiserror::Error;

pub use keys::{Address, Credentials, PrivateKey};
pub use signature::{sign, HybridClock, RequestSignature, SignedBackendRequest};

/// Malformed credential material. Always surfaced at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("malformed private key: {0}")]
    MalformedPrivateKey(String),

    #[error("malformed {field} address: {reason}")]
    MalformedAddress { field: &'static str, reason: String },
}
