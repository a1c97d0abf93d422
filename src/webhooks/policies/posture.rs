//! Pod-wide run-as-non-root / run-as-user policy.
//!
//! Every combination of the two settings maps to exactly one
//! [`PostureDecision`]:
//!
//! | runAsNonRoot \ runAsUser | unset             | 0                   | other      |
//! |--------------------------|-------------------|---------------------|------------|
//! | unset                    | default both      | default `false`     | default `true` |
//! | true                     | keep              | reject              | keep       |
//! | false                    | keep              | keep                | keep       |

use json_patch::PatchOperation;
use json_patch::jsonptr::Pointer;
use serde_json::{Value, json};

use super::add;
use super::uid::UidSource;
use super::view::{PodPosture, PodSecurityView};
use crate::error::PolicyError;

/// Explicitness of `runAsNonRoot`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonRootSetting {
    Unset,
    ExplicitTrue,
    ExplicitFalse,
}

impl From<Option<bool>> for NonRootSetting {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => NonRootSetting::Unset,
            Some(true) => NonRootSetting::ExplicitTrue,
            Some(false) => NonRootSetting::ExplicitFalse,
        }
    }
}

/// Explicitness of `runAsUser`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSetting {
    Unset,
    Root,
    NonRoot(i64),
}

impl From<Option<i64>> for UserSetting {
    fn from(value: Option<i64>) -> Self {
        match value {
            None => UserSetting::Unset,
            Some(0) => UserSetting::Root,
            Some(uid) => UserSetting::NonRoot(uid),
        }
    }
}

/// What to do with the pod-wide posture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostureDecision {
    /// Set `runAsNonRoot: true` and a generated `runAsUser`
    DefaultBothFields,
    /// Set `runAsNonRoot` to the given value, keep the explicit user
    DefaultRunAsNonRootOnly(bool),
    /// Explicit configuration is consistent, leave it alone
    NoOp,
    /// Explicit configuration contradicts itself
    Reject(PolicyError),
}

/// Decide what to do for a given pair of settings
pub fn decide(non_root: NonRootSetting, user: UserSetting) -> PostureDecision {
    match (non_root, user) {
        (NonRootSetting::Unset, UserSetting::Unset) => PostureDecision::DefaultBothFields,
        // Never default to non-root while the explicit user is root
        (NonRootSetting::Unset, UserSetting::Root) => PostureDecision::DefaultRunAsNonRootOnly(false),
        (NonRootSetting::Unset, UserSetting::NonRoot(_)) => {
            PostureDecision::DefaultRunAsNonRootOnly(true)
        }
        (NonRootSetting::ExplicitTrue, UserSetting::Root) => {
            PostureDecision::Reject(PolicyError::PostureConflict { run_as_user: 0 })
        }
        (NonRootSetting::ExplicitTrue, _) | (NonRootSetting::ExplicitFalse, _) => {
            PostureDecision::NoOp
        }
    }
}

/// Decide for a posture read from a pod
pub fn decide_posture(posture: &PodPosture) -> PostureDecision {
    decide(posture.run_as_non_root.into(), posture.run_as_user.into())
}

/// Compute the pod-wide patches, or the conflict that rejects the pod.
///
/// When the pod has no `securityContext` object, an empty one is added
/// first so the field patches apply.
pub fn posture_patches(
    view: &PodSecurityView,
    uids: &dyn UidSource,
) -> Result<Vec<PatchOperation>, PolicyError> {
    let fields: Vec<(&str, Value)> = match decide_posture(&view.posture()) {
        PostureDecision::Reject(err) => return Err(err),
        PostureDecision::NoOp => return Ok(Vec::new()),
        PostureDecision::DefaultRunAsNonRootOnly(non_root) => {
            vec![("runAsNonRoot", Value::Bool(non_root))]
        }
        PostureDecision::DefaultBothFields => vec![
            ("runAsNonRoot", Value::Bool(true)),
            ("runAsUser", json!(uids.next_uid())),
        ],
    };

    let context = Pointer::from_static("/spec/securityContext");
    let mut patches = Vec::with_capacity(fields.len() + 1);
    if view.security_context.is_none() {
        patches.push(add(context.to_buf(), json!({})));
    }
    for (name, value) in fields {
        let mut path = context.to_buf();
        path.push_back(name);
        patches.push(add(path, value));
    }

    Ok(patches)
}
