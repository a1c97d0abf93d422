//! Pod security baseline policy.
//!
//! The policy is a pure function of a [`PodSecurityView`] and a
//! [`UidSource`]. It either returns the JSON patch operations that bring
//! the pod up to the baseline, or rejects the pod:
//! - Pod posture: `runAsNonRoot` / `runAsUser` defaulting and conflict check
//! - Containers: capabilities, privilege escalation and seccomp defaults
//!
//! Explicitly set fields are never overwritten.

pub mod containers;
pub mod posture;
pub mod uid;
pub mod view;

use json_patch::jsonptr::{Pointer, PointerBuf};
use json_patch::{AddOperation, PatchOperation};
use serde_json::Value;

use crate::error::PolicyError;

pub use containers::default_containers;
pub use posture::{NonRootSetting, PostureDecision, UserSetting, decide};
pub use uid::{DEFAULT_UID_RANGE, RandomUids, UidSource};
pub use view::{CapabilitySet, ContainerSecurity, ContainerSecurityView, PodPosture, PodSecurityView};

/// Location of `spec.containers`
pub fn containers_prefix() -> &'static Pointer {
    Pointer::from_static("/spec/containers")
}

/// Location of `spec.initContainers`
pub fn init_containers_prefix() -> &'static Pointer {
    Pointer::from_static("/spec/initContainers")
}

pub(crate) fn add(path: PointerBuf, value: Value) -> PatchOperation {
    PatchOperation::Add(AddOperation { path, value })
}

/// Evaluate the baseline for one pod.
///
/// Patches are ordered pod-wide first, then `containers`, then
/// `initContainers`. On a posture conflict no container is inspected.
pub fn evaluate(
    view: &PodSecurityView,
    uids: &dyn UidSource,
) -> Result<Vec<PatchOperation>, PolicyError> {
    let mut patches = posture::posture_patches(view, uids)?;
    patches.extend(default_containers(containers_prefix(), &view.containers));
    patches.extend(default_containers(
        init_containers_prefix(),
        &view.init_containers,
    ));
    Ok(patches)
}
