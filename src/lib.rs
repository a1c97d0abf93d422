//! pod-security-webhook library crate
//!
//! This module exports the security policy, the admission boundary and the
//! servers that expose them.

pub mod config;
pub mod error;
pub mod health;
pub mod webhooks;

pub use config::WebhookConfig;
pub use error::{AdmissionError, PolicyError, WebhookError};
pub use health::HealthState;
pub use webhooks::{AdmissionPolicy, run_webhook_server};
