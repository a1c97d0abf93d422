//! Error types for the webhook.
//!
//! `PolicyError` is the only error the security policy itself can raise.
//! `AdmissionError` covers everything that makes a request impossible to
//! evaluate, and `WebhookError` covers server start-up.

use thiserror::Error;

/// Error raised by the pod security policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// `runAsNonRoot: true` paired with `runAsUser: 0`
    #[error("runAsNonRoot specified, but runAsUser set to {run_as_user} (the root user)")]
    PostureConflict {
        /// The explicit user id that collided with `runAsNonRoot`
        run_as_user: i64,
    },
}

impl PolicyError {
    /// Short machine-readable reason used in denial messages
    pub fn reason(&self) -> &'static str {
        match self {
            PolicyError::PostureConflict { .. } => "PostureConflict",
        }
    }

    /// Policy errors describe the submitted object, resubmitting it cannot help
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Error that prevents an admission request from being evaluated
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// The request carried no object
    #[error("Missing object in request")]
    MissingObject,

    /// The object could not be decoded as a Pod
    #[error("could not deserialize pod object: {0}")]
    Decode(String),

    /// The object violates the security policy
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The computed patch could not be attached to the response
    #[error("could not serialize patch: {0}")]
    Patch(String),
}

impl AdmissionError {
    /// Short machine-readable reason used in denial messages
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::MissingObject | AdmissionError::Decode(_) => "InvalidRequest",
            AdmissionError::Policy(e) => e.reason(),
            AdmissionError::Patch(_) => "InternalError",
        }
    }
}

/// Errors that can occur when starting the webhook
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    /// Server error
    #[error("Webhook server error: {0}")]
    Server(#[from] std::io::Error),
}
