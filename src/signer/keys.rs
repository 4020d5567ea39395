//! Credential parsing: hex private keys and bech32 addresses.

use std::fmt;

use k256::ecdsa::{SigningKey, VerifyingKey};

use super::CredentialError;

/// Length of a secp256k1 secret scalar in bytes.
const PRIVATE_KEY_LEN: usize = 32;

/// Operator signing key. `Debug` never prints key material.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Parse a hex-encoded secp256k1 key, with or without a `0x` prefix.
    pub fn from_hex(input: &str) -> Result<Self, CredentialError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(digits)
            .map_err(|e| CredentialError::MalformedPrivateKey(format!("invalid hex: {e}")))?;

        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(CredentialError::MalformedPrivateKey(format!(
                "expected {PRIVATE_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let key = SigningKey::from_slice(&bytes).map_err(|_| {
            CredentialError::MalformedPrivateKey("not a valid secp256k1 scalar".to_string())
        })?;

        Ok(Self(key))
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.0
    }

    /// Public half of the key, used to verify signatures.
    pub fn verifying_key(&self) -> VerifyingKey {
        *self.0.verifying_key()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A bech32 account address (e.g. `gonka1...`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Validate `input` as a bech32 string. `field` names the setting in errors.
    pub fn parse(field: &'static str, input: &str) -> Result<Self, CredentialError> {
        let trimmed = input.trim();
        bech32::decode(trimmed).map_err(|e| CredentialError::MalformedAddress {
            field,
            reason: e.to_string(),
        })?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable part, e.g. `gonka`.
    pub fn prefix(&self) -> &str {
        self.0.rsplit_once('1').map_or("", |(hrp, _)| hrp)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

/// The operator's signing identity, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub private_key: PrivateKey,
    /// Address requests are issued from (`X-Requester-Address`).
    pub operator: Address,
    /// Provider address bound into every signature.
    pub provider: Address,
}

impl Credentials {
    pub fn parse(private_key: &str, operator: &str, provider: &str) -> Result<Self, CredentialError> {
        Ok(Self {
            private_key: PrivateKey::from_hex(private_key)?,
            operator: Address::parse("operator", operator)?,
            provider: Address::parse("provider", provider)?,
        })
    }
}
