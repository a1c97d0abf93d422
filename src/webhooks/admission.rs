//! Admission boundary for the pod security policy.
//!
//! Turns an `AdmissionRequest` into a policy evaluation and the result
//! back into an `AdmissionResponse`:
//! - Non-pod resources pass through unchanged
//! - Excluded namespaces and non-CREATE operations pass through unchanged
//! - Undecodable objects are denied
//! - Posture conflicts are denied, everything else gets a JSON patch

use std::collections::BTreeSet;
use std::sync::Arc;

use json_patch::{Patch, PatchOperation};
use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, Operation};
use tracing::{debug, error, info, warn};

use crate::error::AdmissionError;
use crate::webhooks::policies::{PodSecurityView, UidSource, evaluate};

/// Why a request was let through without evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Resource is not core `v1/pods`
    NotAPod,
    /// Namespace is on the exclusion list
    ExcludedNamespace,
    /// Only CREATE requests are mutated
    NotACreate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotAPod => "NotAPod",
            SkipReason::ExcludedNamespace => "ExcludedNamespace",
            SkipReason::NotACreate => "NotACreate",
        }
    }
}

/// Result of reviewing one admission request
#[derive(Debug)]
pub enum AdmissionOutcome {
    /// Pod needs the given patches
    Mutated(Vec<PatchOperation>),
    /// Pod already meets the baseline
    Unchanged,
    /// Request was not evaluated
    Skipped(SkipReason),
    /// Request must be rejected
    Denied(AdmissionError),
}

impl AdmissionOutcome {
    /// Metric label for this outcome
    pub fn label(&self) -> &'static str {
        match self {
            AdmissionOutcome::Mutated(_) => "mutated",
            AdmissionOutcome::Unchanged => "unchanged",
            AdmissionOutcome::Skipped(_) => "skipped",
            AdmissionOutcome::Denied(_) => "denied",
        }
    }

    /// Number of patch operations carried
    pub fn patch_count(&self) -> usize {
        match self {
            AdmissionOutcome::Mutated(patches) => patches.len(),
            _ => 0,
        }
    }
}

/// Admission-side settings wrapped around the policy
#[derive(Clone)]
pub struct AdmissionPolicy {
    excluded_namespaces: BTreeSet<String>,
    uids: Arc<dyn UidSource>,
}

impl AdmissionPolicy {
    /// Create a policy with the given namespace exclusions and user id source
    pub fn new(excluded_namespaces: BTreeSet<String>, uids: Arc<dyn UidSource>) -> Self {
        Self {
            excluded_namespaces,
            uids,
        }
    }

    /// Check if requests in `namespace` bypass the policy
    pub fn is_excluded(&self, namespace: Option<&str>) -> bool {
        namespace.is_some_and(|ns| self.excluded_namespaces.contains(ns))
    }

    /// Review one admission request
    pub fn review(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionOutcome {
        let uid = &request.uid;

        if !is_pod_resource(request) {
            warn!(
                uid = %uid,
                group = %request.resource.group,
                version = %request.resource.version,
                resource = %request.resource.resource,
                sub_resource = ?request.sub_resource,
                kind = %request.kind.kind,
                "Expected v1/pods with a Pod object, letting request through"
            );
            return AdmissionOutcome::Skipped(SkipReason::NotAPod);
        }

        if request.operation != Operation::Create {
            debug!(uid = %uid, operation = ?request.operation, "Not a CREATE, letting request through");
            return AdmissionOutcome::Skipped(SkipReason::NotACreate);
        }

        if self.is_excluded(request.namespace.as_deref()) {
            debug!(uid = %uid, namespace = ?request.namespace, "Namespace excluded from policy");
            return AdmissionOutcome::Skipped(SkipReason::ExcludedNamespace);
        }

        let pod = match decode_pod(request) {
            Ok(pod) => pod,
            Err(e) => {
                error!(uid = %uid, error = %e, "Failed to decode pod");
                return AdmissionOutcome::Denied(e);
            }
        };

        match evaluate(&PodSecurityView::from(&pod), self.uids.as_ref()) {
            Ok(patches) if patches.is_empty() => AdmissionOutcome::Unchanged,
            Ok(patches) => AdmissionOutcome::Mutated(patches),
            Err(e) => AdmissionOutcome::Denied(e.into()),
        }
    }
}

/// Only the pod itself: subresources such as `pods/eviction` or
/// `pods/binding` carry other kinds of objects.
fn is_pod_resource(request: &AdmissionRequest<DynamicObject>) -> bool {
    let resource = &request.resource;
    let kind = &request.kind;
    resource.group.is_empty()
        && resource.version == "v1"
        && resource.resource == "pods"
        && request.sub_resource.is_none()
        && kind.group.is_empty()
        && kind.version == "v1"
        && kind.kind == "Pod"
}

fn decode_pod(request: &AdmissionRequest<DynamicObject>) -> Result<Pod, AdmissionError> {
    let object = request.object.clone().ok_or(AdmissionError::MissingObject)?;
    object
        .try_parse::<Pod>()
        .map_err(|e| AdmissionError::Decode(e.to_string()))
}

/// Create a denial response with reason embedded in message.
/// kube-rs deny() only sets status.message, so we format as "[reason] message"
fn deny_with_reason(
    request: &AdmissionRequest<DynamicObject>,
    err: &AdmissionError,
) -> AdmissionResponse {
    AdmissionResponse::from(request).deny(format!("[{}] {}", err.reason(), err))
}

/// Build the admission response for an outcome
pub fn into_response(
    request: &AdmissionRequest<DynamicObject>,
    outcome: &AdmissionOutcome,
) -> AdmissionResponse {
    let uid = &request.uid;
    match outcome {
        AdmissionOutcome::Mutated(patches) => {
            match AdmissionResponse::from(request).with_patch(Patch(patches.clone())) {
                Ok(response) => {
                    info!(uid = %uid, patches = patches.len(), "Admission request allowed with patches");
                    response
                }
                Err(e) => {
                    let err = AdmissionError::Patch(e.to_string());
                    error!(uid = %uid, error = %err, "Failed to attach patch");
                    deny_with_reason(request, &err)
                }
            }
        }
        AdmissionOutcome::Unchanged => {
            info!(uid = %uid, "Admission request allowed");
            AdmissionResponse::from(request)
        }
        AdmissionOutcome::Skipped(reason) => {
            debug!(uid = %uid, reason = reason.as_str(), "Admission request skipped");
            AdmissionResponse::from(request)
        }
        AdmissionOutcome::Denied(err) => {
            warn!(uid = %uid, reason = err.reason(), message = %err, "Admission request denied");
            deny_with_reason(request, err)
        }
    }
}
