//! Runtime configuration for gonka-gateway.
//!
//! Every setting is read from the command line or, more commonly, from the
//! environment (optionally seeded from a `.env` file). Validation happens once
//! at startup; the resulting [`Config`] is immutable and shared via `Arc`.

use std::fmt;
use std::time::Duration;

use clap::Parser;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::signer::{CredentialError, Credentials};

/// Command-line arguments.
#[derive(Parser, Clone)]
#[command(
    name = "gonka-gateway",
    version,
    about = "OpenAI-compatible gateway for the Gonka API"
)]
pub struct Cli {
    /// Hex-encoded secp256k1 private key used to sign backend requests.
    #[arg(long, env = "GONKA_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Operator address (bech32) the requests are issued from.
    #[arg(long, env = "GONKA_ADDRESS")]
    pub address: Option<String>,

    /// Base URL of the Gonka API (e.g. https://node.example/v1).
    #[arg(long, env = "GONKA_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Provider address (bech32) bound into every signature.
    #[arg(long, env = "GONKA_PROVIDER_ADDRESS")]
    pub provider_address: Option<String>,

    /// API key clients must present in the Authorization header.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Bind host.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Timeout for non-streaming backend calls, in seconds.
    #[arg(long, env = "GONKA_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

/// Startup configuration failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("invalid GONKA_ENDPOINT {0:?}: expected an http(s) URL")]
    InvalidEndpoint(String),
}

/// Top-level configuration.
#[derive(Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub credentials: Credentials,
    pub api_key: ApiKey,
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Backend connection settings.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL without a trailing slash.
    pub endpoint: String,

    /// Timeout applied to unary calls. Streams only use the connect timeout.
    pub request_timeout: Duration,

    pub connect_timeout: Duration,
}

/// The static key protecting the OpenAI endpoints.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Constant-time comparison against a presented token.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn required<'a>(
    value: Option<&'a String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> &'a str {
    match value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => {
            missing.push(name);
            ""
        }
    }
}

impl Config {
    /// Validate the raw arguments into a usable configuration.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let private_key = required(cli.private_key.as_ref(), "GONKA_PRIVATE_KEY", &mut missing);
        let address = required(cli.address.as_ref(), "GONKA_ADDRESS", &mut missing);
        let endpoint = required(cli.endpoint.as_ref(), "GONKA_ENDPOINT", &mut missing);
        let provider = required(
            cli.provider_address.as_ref(),
            "GONKA_PROVIDER_ADDRESS",
            &mut missing,
        );
        let api_key = required(cli.api_key.as_ref(), "API_KEY", &mut missing);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let credentials = Credentials::parse(private_key, address, provider)?;

        let url = reqwest::Url::parse(endpoint)
            .map_err(|_| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            server: ServerConfig {
                host: cli.host.clone(),
                port: cli.port,
            },
            backend: BackendConfig {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                request_timeout: Duration::from_secs(cli.timeout_secs),
                connect_timeout: CONNECT_TIMEOUT,
            },
            credentials,
            api_key: ApiKey::new(api_key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::keys::test_support::{address, key_hex};

    fn cli() -> Cli {
        Cli {
            private_key: Some(key_hex(0x42)),
            address: Some(address(1)),
            endpoint: Some("https://gonka.example/v1/".to_string()),
            provider_address: Some(address(2)),
            api_key: Some("sk-test".to_string()),
            host: "127.0.0.1".to_string(),
            port: 8000,
            timeout_secs: 60,
            verbose: false,
            log_json: false,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = Config::from_cli(&cli()).unwrap();
        assert_eq!(config.backend.endpoint, "https://gonka.example/v1");
        assert_eq!(config.server.listen_addr(), "127.0.0.1:8000");
        assert!(config.api_key.matches("sk-test"));
        assert!(!config.api_key.matches("sk-tes"));
    }

    #[test]
    fn test_missing_values_are_all_reported() {
        let mut args = cli();
        args.private_key = None;
        args.api_key = Some("   ".to_string());

        match Config::from_cli(&args) {
            Err(ConfigError::Missing(names)) => {
                assert_eq!(names, vec!["GONKA_PRIVATE_KEY", "API_KEY"]);
            }
            other => panic!("expected missing config, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_credentials_fail() {
        let mut args = cli();
        args.private_key = Some("abc".to_string());
        assert!(matches!(
            Config::from_cli(&args),
            Err(ConfigError::Credential(CredentialError::MalformedPrivateKey(_)))
        ));

        let mut args = cli();
        args.provider_address = Some("not-bech32".to_string());
        assert!(matches!(
            Config::from_cli(&args),
            Err(ConfigError::Credential(CredentialError::MalformedAddress { .. }))
        ));
    }

    #[test]
    fn test_endpoint_must_be_http() {
        let mut args = cli();
        args.endpoint = Some("ftp://gonka.example".to_string());
        assert!(matches!(
            Config::from_cli(&args),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let config = Config::from_cli(&cli()).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-test"));
        assert!(!printed.contains(&key_hex(0x42)));
    }
}
