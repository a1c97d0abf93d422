// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for pod-security-webhook.
//!
//! These tests run without a Kubernetes cluster and drive the public API
//! with typed Pod fixtures.

#[path = "../common/fixtures.rs"]
#[allow(dead_code)]
mod fixtures;

mod policy_tests {
    use super::fixtures::*;
    use json_patch::PatchOperation;
    use k8s_openapi::api::core::v1::SecurityContext;
    use pod_security_webhook::PolicyError;
    use pod_security_webhook::webhooks::policies::DEFAULT_UID_RANGE;
    use pod_security_webhook::webhooks::{PodSecurityView, RandomUids, evaluate};
    use serde_json::{Value, json};

    fn add_ops(patches: &[PatchOperation]) -> Vec<(String, Value)> {
        patches
            .iter()
            .map(|op| match op {
                PatchOperation::Add(add) => (add.path.as_str().to_string(), add.value.clone()),
                other => panic!("unexpected operation {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_unset_posture_gets_random_user() {
        let pod = PodBuilder::new("web")
            .empty_security_context()
            .container(hardened_container("app"))
            .build();

        let ops = add_ops(&evaluate(&PodSecurityView::from(&pod), &RandomUids).unwrap());
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], ("/spec/securityContext/runAsNonRoot".to_string(), json!(true)));
        assert_eq!(ops[1].0, "/spec/securityContext/runAsUser");
        let uid = ops[1].1.as_i64().unwrap();
        assert!(DEFAULT_UID_RANGE.contains(&uid), "uid {} out of range", uid);
    }

    #[test]
    fn test_root_user_without_non_root() {
        let pod = PodBuilder::new("web")
            .run_as_user(0)
            .container(hardened_container("app"))
            .build();

        let ops = add_ops(&evaluate(&PodSecurityView::from(&pod), &RandomUids).unwrap());
        assert_eq!(
            ops,
            vec![("/spec/securityContext/runAsNonRoot".to_string(), json!(false))]
        );
    }

    #[test]
    fn test_conflicting_posture_rejected() {
        let pod = PodBuilder::new("web")
            .run_as_non_root(true)
            .run_as_user(0)
            .container(bare_container("app"))
            .build();

        let err = evaluate(&PodSecurityView::from(&pod), &RandomUids).unwrap_err();
        assert_eq!(err, PolicyError::PostureConflict { run_as_user: 0 });
    }

    #[test]
    fn test_partial_container_context() {
        let pod = PodBuilder::new("web")
            .run_as_non_root(false)
            .container(container_with(
                "app",
                SecurityContext {
                    allow_privilege_escalation: Some(true),
                    ..Default::default()
                },
            ))
            .build();

        let ops = add_ops(&evaluate(&PodSecurityView::from(&pod), &RandomUids).unwrap());
        assert_eq!(
            ops,
            vec![
                (
                    "/spec/containers/0/securityContext/capabilities".to_string(),
                    json!({"drop": ["ALL"]})
                ),
                (
                    "/spec/containers/0/securityContext/seccompProfile".to_string(),
                    json!({"type": "RuntimeDefault"})
                ),
            ]
        );
    }

    #[test]
    fn test_init_containers_defaulted_like_containers() {
        let pod = PodBuilder::new("web")
            .run_as_non_root(true)
            .container(bare_container("app"))
            .init_container(hardened_container("migrate"))
            .init_container(bare_container("seed"))
            .build();

        let ops = add_ops(&evaluate(&PodSecurityView::from(&pod), &RandomUids).unwrap());
        let paths: Vec<&str> = ops.iter().map(|(path, _)| path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/spec/containers/0/securityContext",
                "/spec/initContainers/1/securityContext",
            ]
        );
        assert_eq!(ops[0].1, ops[1].1);
    }
}

mod admission_tests {
    use super::fixtures::*;
    use pod_security_webhook::webhooks::{AdmissionOutcome, SkipReason, into_response};
    use pod_security_webhook::{AdmissionError, AdmissionPolicy, WebhookConfig};
    use std::sync::Arc;

    fn policy() -> AdmissionPolicy {
        let config = WebhookConfig::default();
        AdmissionPolicy::new(config.excluded_namespaces, Arc::new(|| 1_000_999_998_i64))
    }

    #[test]
    fn test_create_pod_is_patched() {
        let pod = PodBuilder::new("web")
            .namespace("apps")
            .container(bare_container("app"))
            .build();
        let request = create_pod_request(&pod);

        let outcome = policy().review(&request);
        // securityContext, runAsNonRoot, runAsUser, container securityContext
        assert_eq!(outcome.patch_count(), 4);

        let response = into_response(&request, &outcome);
        assert!(response.allowed);
    }

    #[test]
    fn test_kube_system_is_excluded_by_default() {
        let pod = PodBuilder::new("coredns")
            .namespace("kube-system")
            .container(bare_container("coredns"))
            .build();

        let outcome = policy().review(&create_pod_request(&pod));
        assert!(matches!(
            outcome,
            AdmissionOutcome::Skipped(SkipReason::ExcludedNamespace)
        ));
    }

    #[test]
    fn test_missing_object_is_denied() {
        let request = admission_request("CREATE", "pods", "apps", serde_json::Value::Null);

        let outcome = policy().review(&request);
        assert!(matches!(
            outcome,
            AdmissionOutcome::Denied(AdmissionError::MissingObject)
        ));
        let response = into_response(&request, &outcome);
        assert!(!response.allowed);
        assert!(response.result.message.contains("Missing object"));
    }

    #[test]
    fn test_conflict_denied_verbatim() {
        let pod = PodBuilder::new("web")
            .namespace("apps")
            .run_as_non_root(true)
            .run_as_user(0)
            .container(bare_container("app"))
            .build();
        let request = create_pod_request(&pod);

        let response = into_response(&request, &policy().review(&request));
        assert!(!response.allowed);
        assert_eq!(
            response.result.message,
            "[PostureConflict] runAsNonRoot specified, but runAsUser set to 0 (the root user)"
        );
    }
}
