// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for pod-security-webhook.
//!
//! Generates arbitrary pod security configurations and checks the policy's
//! invariants.

#[path = "../common/fixtures.rs"]
#[allow(dead_code)]
mod fixtures;

use json_patch::PatchOperation;
use k8s_openapi::api::core::v1::{
    Capabilities, Container, Pod, PodSecurityContext, SeccompProfile, SecurityContext,
};
use proptest::prelude::*;
use serde_json::Value;

use fixtures::{PodBuilder, bare_container, container_with, pod_json};
use pod_security_webhook::PolicyError;
use pod_security_webhook::webhooks::policies::DEFAULT_UID_RANGE;
use pod_security_webhook::webhooks::{PodSecurityView, RandomUids, evaluate};

/// Strategy for `runAsUser`: unset, root, or an ordinary user.
fn any_run_as_user() -> impl Strategy<Value = Option<i64>> {
    prop_oneof![Just(None), Just(Some(0i64)), (1..=65_535i64).prop_map(Some),]
}

/// Strategy for a container with any mix of hardening settings.
fn any_container() -> impl Strategy<Value = Container> {
    (
        any::<bool>(),
        proptest::option::of(any::<bool>()),
        any::<bool>(),
        proptest::option::of(prop_oneof![
            Just("RuntimeDefault".to_string()),
            Just("Unconfined".to_string()),
        ]),
    )
        .prop_map(|(has_context, escalation, has_caps, seccomp)| {
            if !has_context {
                return bare_container("c");
            }
            container_with(
                "c",
                SecurityContext {
                    allow_privilege_escalation: escalation,
                    capabilities: has_caps.then(|| Capabilities {
                        add: Some(vec!["NET_BIND_SERVICE".to_string()]),
                        drop: None,
                    }),
                    seccomp_profile: seccomp.map(|type_| SeccompProfile {
                        type_,
                        localhost_profile: None,
                    }),
                    ..Default::default()
                },
            )
        })
}

/// Strategy for a whole pod.
fn any_pod() -> impl Strategy<Value = Pod> {
    (
        any::<bool>(),
        proptest::option::of(any::<bool>()),
        any_run_as_user(),
        proptest::collection::vec(any_container(), 1..4),
        proptest::collection::vec(any_container(), 0..3),
    )
        .prop_map(|(has_context, non_root, user, containers, init_containers)| {
            let mut builder = PodBuilder::new("web");
            if has_context || non_root.is_some() || user.is_some() {
                builder = builder.empty_security_context();
            }
            if let Some(non_root) = non_root {
                builder = builder.run_as_non_root(non_root);
            }
            if let Some(user) = user {
                builder = builder.run_as_user(user);
            }
            for container in containers {
                builder = builder.container(container);
            }
            for container in init_containers {
                builder = builder.init_container(container);
            }
            builder.build()
        })
}

fn view(pod: &Pod) -> PodSecurityView {
    PodSecurityView::from(pod)
}

fn add_op(op: &PatchOperation) -> (String, Value) {
    match op {
        PatchOperation::Add(add) => (add.path.as_str().to_string(), add.value.clone()),
        other => panic!("unexpected operation {:?}", other),
    }
}

fn posture(pod: &Pod) -> PodSecurityContext {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.security_context.clone())
        .unwrap_or_default()
}

proptest! {
    /// Property: the outcome depends only on the pod posture; a conflict
    /// returns no patches and everything else is accepted.
    #[test]
    fn test_reject_iff_conflict(pod in any_pod()) {
        let ctx = posture(&pod);
        let conflict = ctx.run_as_non_root == Some(true) && ctx.run_as_user == Some(0);

        match evaluate(&view(&pod), &RandomUids) {
            Err(err) => {
                prop_assert!(conflict);
                prop_assert_eq!(err, PolicyError::PostureConflict { run_as_user: 0 });
            }
            Ok(_) => prop_assert!(!conflict),
        }
    }

    /// Property: an unset posture gets `runAsNonRoot: true` and a user id in range.
    #[test]
    fn test_unset_posture_defaults(containers in proptest::collection::vec(any_container(), 1..4)) {
        let mut builder = PodBuilder::new("web");
        for container in containers {
            builder = builder.container(container);
        }
        let pod = builder.build();

        let ops: Vec<_> = evaluate(&view(&pod), &RandomUids).unwrap().iter().map(add_op).collect();
        prop_assert_eq!(&ops[1], &("/spec/securityContext/runAsNonRoot".to_string(), Value::Bool(true)));
        prop_assert_eq!(&ops[2].0, "/spec/securityContext/runAsUser");
        prop_assert!(DEFAULT_UID_RANGE.contains(&ops[2].1.as_i64().unwrap()));
    }

    /// Property: explicit `runAsNonRoot: false` never produces a pod-wide patch.
    #[test]
    fn test_explicit_false_untouched(user in any_run_as_user(), container in any_container()) {
        let mut builder = PodBuilder::new("web").run_as_non_root(false).container(container);
        if let Some(user) = user {
            builder = builder.run_as_user(user);
        }
        let pod = builder.build();

        let ops = evaluate(&view(&pod), &RandomUids).unwrap();
        prop_assert!(ops.iter().map(add_op).all(|(path, _)| path.starts_with("/spec/containers/")));
    }

    /// Property: applying the patches and re-evaluating yields nothing more.
    #[test]
    fn test_idempotent(pod in any_pod()) {
        let Ok(patches) = evaluate(&view(&pod), &RandomUids) else {
            return Ok(());
        };

        let mut doc = pod_json(&pod);
        json_patch::patch(&mut doc, &patches).unwrap();
        let patched: Pod = serde_json::from_value(doc).unwrap();

        let again = evaluate(&view(&patched), &RandomUids).unwrap();
        prop_assert!(again.is_empty(), "second pass produced {:?}", again);

        let ctx = posture(&patched);
        prop_assert!(ctx.run_as_non_root.is_some());
        prop_assert!(!(ctx.run_as_non_root == Some(true) && ctx.run_as_user == Some(0)));
    }

    /// Property: container patch paths are positional and prefixed per collection.
    #[test]
    fn test_positional_paths(
        containers in 1..5usize,
        init_containers in 0..4usize,
    ) {
        let mut builder = PodBuilder::new("web").run_as_non_root(false);
        for _ in 0..containers {
            builder = builder.container(bare_container("c"));
        }
        for _ in 0..init_containers {
            builder = builder.init_container(bare_container("i"));
        }
        let pod = builder.build();

        let paths: Vec<String> = evaluate(&view(&pod), &RandomUids)
            .unwrap()
            .iter()
            .map(|op| add_op(op).0)
            .collect();
        let expected: Vec<String> = (0..containers)
            .map(|i| format!("/spec/containers/{}/securityContext", i))
            .chain((0..init_containers).map(|i| format!("/spec/initContainers/{}/securityContext", i)))
            .collect();
        prop_assert_eq!(paths, expected);
    }
}
