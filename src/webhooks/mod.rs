//! Mutating admission webhook for pods.
//!
//! - `policies`: the pod security baseline (pure, no I/O)
//! - `admission`: request filtering, decoding and response building
//! - `server`: HTTPS endpoint serving admission reviews

pub mod admission;
pub mod policies;
mod server;

pub use admission::{AdmissionOutcome, AdmissionPolicy, SkipReason, into_response};
pub use policies::{PodSecurityView, RandomUids, UidSource, evaluate};
pub use server::{
    MUTATE_PODS_PATH, WebhookState, create_webhook_router, handle_review, run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
