//! Runtime configuration read from environment variables.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::WebhookError;

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;
/// Default health and metrics server port
pub const HEALTH_PORT: u16 = 8080;
/// Namespaces left alone unless configured otherwise
pub const DEFAULT_EXCLUDED_NAMESPACES: &[&str] = &["kube-system", "kube-public"];

/// Webhook configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub webhook_port: u16,
    pub health_port: u16,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub excluded_namespaces: BTreeSet<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            webhook_port: WEBHOOK_PORT,
            health_port: HEALTH_PORT,
            cert_path: PathBuf::from(WEBHOOK_CERT_PATH),
            key_path: PathBuf::from(WEBHOOK_KEY_PATH),
            excluded_namespaces: DEFAULT_EXCLUDED_NAMESPACES
                .iter()
                .map(|ns| ns.to_string())
                .collect(),
        }
    }
}

impl WebhookConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, WebhookError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Recognized keys: `WEBHOOK_PORT`, `HEALTH_PORT`, `WEBHOOK_CERT_PATH`,
    /// `WEBHOOK_KEY_PATH`, `EXCLUDED_NAMESPACES` (comma-separated, may be
    /// empty to exclude nothing).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WebhookError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("WEBHOOK_PORT") {
            config.webhook_port = parse_port("WEBHOOK_PORT", &port)?;
        }
        if let Some(port) = lookup("HEALTH_PORT") {
            config.health_port = parse_port("HEALTH_PORT", &port)?;
        }
        if let Some(path) = lookup("WEBHOOK_CERT_PATH") {
            config.cert_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("WEBHOOK_KEY_PATH") {
            config.key_path = PathBuf::from(path);
        }
        if let Some(namespaces) = lookup("EXCLUDED_NAMESPACES") {
            config.excluded_namespaces = namespaces
                .split(',')
                .map(str::trim)
                .filter(|ns| !ns.is_empty())
                .map(str::to_string)
                .collect();
        }

        if config.webhook_port == config.health_port {
            return Err(WebhookError::Config(format!(
                "WEBHOOK_PORT and HEALTH_PORT must differ (both {})",
                config.webhook_port
            )));
        }

        Ok(config)
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16, WebhookError> {
    value
        .trim()
        .parse()
        .map_err(|e| WebhookError::Config(format!("{} must be a port number, got {:?}: {}", key, value, e)))
}
