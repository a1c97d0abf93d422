//! Admission webhook server.
//!
//! Provides the HTTP endpoint for the Kubernetes mutating admission webhook.
//!
//! To enable the webhook:
//! 1. Deploy cert-manager for TLS certificates
//! 2. Create a MutatingWebhookConfiguration pointing at `/mutate-pods`
//! 3. Mount the TLS certificate secret to the webhook pod at /etc/webhook/certs/

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use axum_server::tls_rustls::RustlsConfig;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use tracing::{debug, error, info};

use crate::config::WebhookConfig;
use crate::error::WebhookError;
use crate::health::HealthState;
use crate::webhooks::admission::{AdmissionPolicy, into_response};

/// Path the API server posts pod admission reviews to
pub const MUTATE_PODS_PATH: &str = "/mutate-pods";

/// Shared state for webhook handlers
pub struct WebhookState {
    pub policy: AdmissionPolicy,
    pub health: Arc<HealthState>,
}

impl WebhookState {
    pub fn new(policy: AdmissionPolicy, health: Arc<HealthState>) -> Self {
        Self { policy, health }
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(MUTATE_PODS_PATH, post(mutate_pods))
        .with_state(state)
}

/// Review a pod admission request and apply security defaults
async fn mutate_pods(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> impl IntoResponse {
    let (status, response) = handle_review(&state, review);
    (status, Json(response.into_review()))
}

/// Review an `AdmissionReview`, recording metrics.
///
/// A review without a usable request is answered with 400 and an invalid
/// response so the API server fails closed.
pub fn handle_review(
    state: &WebhookState,
    review: AdmissionReview<DynamicObject>,
) -> (StatusCode, AdmissionResponse) {
    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to extract admission request");
            state.health.metrics.record_admission("invalid", 0, 0.0);
            return (
                StatusCode::BAD_REQUEST,
                AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", e)),
            );
        }
    };

    debug!(
        uid = %request.uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = %request.name,
        dry_run = request.dry_run,
        "Processing admission request"
    );

    let started = Instant::now();
    let outcome = state.policy.review(&request);
    let response = into_response(&request, &outcome);
    state.health.metrics.record_admission(
        outcome.label(),
        outcome.patch_count(),
        started.elapsed().as_secs_f64(),
    );

    (StatusCode::OK, response)
}

/// Run the webhook server with TLS
///
/// Binds to `0.0.0.0:<webhook_port>` and serves [`MUTATE_PODS_PATH`].
/// Readiness is reported only once the port is bound and the TLS material
/// has been loaded.
pub async fn run_webhook_server(
    config: &WebhookConfig,
    policy: AdmissionPolicy,
    health: Arc<HealthState>,
) -> Result<(), WebhookError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
    let listener = TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;

    let tls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let state = Arc::new(WebhookState::new(policy, health.clone()));
    let app = create_webhook_router(state);

    info!(port = config.webhook_port, "Webhook server listening with TLS");
    health.set_ready(true).await;

    axum_server::from_tcp_rustls(listener, tls)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
