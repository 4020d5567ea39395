//! Deterministic request signatures.
//!
//! The signed message is `body || decimal(timestamp_ns) || provider_address`.
//! It is hashed with SHA-256 and signed with RFC 6979 deterministic ECDSA on
//! secp256k1. `s` is normalized to the lower half of the curve order and the
//! 64-byte `r || s` pair is transmitted base64-encoded.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use k256::ecdsa::signature::DigestSigner;
use k256::ecdsa::Signature;
use sha2::{Digest, Sha256};

use super::keys::{Address, Credentials, PrivateKey};

/// Signature material attached to one outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSignature {
    /// Base64 `r || s`, sent as the `Authorization` header.
    pub signature: String,
    /// Operator address, sent as `X-Requester-Address`.
    pub requester: Address,
    /// Nanosecond timestamp bound into the signature, sent as `X-Timestamp`.
    pub timestamp_ns: u64,
}

/// Sign `body` for `provider` at `timestamp_ns`.
pub fn sign(
    body: &[u8],
    key: &PrivateKey,
    operator: &Address,
    provider: &Address,
    timestamp_ns: u64,
) -> RequestSignature {
    let mut digest = Sha256::new();
    digest.update(body);
    digest.update(timestamp_ns.to_string().as_bytes());
    digest.update(provider.as_str().as_bytes());

    let signature: Signature = key.signing_key().sign_digest(digest);
    let signature = signature.normalize_s().unwrap_or(signature);

    RequestSignature {
        signature: BASE64.encode(signature.to_bytes()),
        requester: operator.clone(),
        timestamp_ns,
    }
}

/// Wall-clock timestamps that never run backwards.
///
/// The wall clock is read once; later readings add monotonic elapsed time.
#[derive(Debug, Clone)]
pub struct HybridClock {
    wall_base_ns: u64,
    mono_base: Instant,
}

impl HybridClock {
    pub fn new() -> Self {
        let wall_base_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self {
            wall_base_ns: u64::try_from(wall_base_ns).unwrap_or(u64::MAX),
            mono_base: Instant::now(),
        }
    }

    pub fn now_ns(&self) -> u64 {
        let elapsed = u64::try_from(self.mono_base.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.wall_base_ns.saturating_add(elapsed)
    }
}

impl Default for HybridClock {
    fn default() -> Self {
        Self::new()
    }
}

/// A request body together with its signature.
///
/// Not `Clone`: a signature belongs to exactly one send attempt. Retrying
/// means building a new one.
#[derive(Debug)]
pub struct SignedBackendRequest {
    body: Bytes,
    signature: RequestSignature,
}

impl SignedBackendRequest {
    pub fn new(body: impl Into<Bytes>, credentials: &Credentials, timestamp_ns: u64) -> Self {
        let body = body.into();
        let signature = sign(
            &body,
            &credentials.private_key,
            &credentials.operator,
            &credentials.provider,
            timestamp_ns,
        );
        Self { body, signature }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn signature(&self) -> &RequestSignature {
        &self.signature
    }

    pub fn into_parts(self) -> (Bytes, RequestSignature) {
        (self.body, self.signature)
    }
}
