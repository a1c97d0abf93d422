//! Container hardening defaults.
//!
//! Applied identically to `containers` and `initContainers`:
//! - Capabilities: drop `ALL` when no capabilities object is present
//! - Privilege escalation: disallowed unless set
//! - Seccomp: `RuntimeDefault` unless a profile is set
//!
//! A container without any `securityContext` gets all three in one patch.

use json_patch::PatchOperation;
use json_patch::jsonptr::{Pointer, PointerBuf};
use serde_json::{Value, json};

use super::add;
use super::view::ContainerSecurityView;

/// Capability dropped from every container by default
pub const DROPPED_CAPABILITY: &str = "ALL";
/// Seccomp profile type applied by default
pub const DEFAULT_SECCOMP_PROFILE: &str = "RuntimeDefault";

fn default_capabilities() -> Value {
    json!({ "drop": [DROPPED_CAPABILITY] })
}

fn default_seccomp_profile() -> Value {
    json!({ "type": DEFAULT_SECCOMP_PROFILE })
}

/// Complete `securityContext` for containers that have none
pub fn default_security_context() -> Value {
    json!({
        "capabilities": default_capabilities(),
        "allowPrivilegeEscalation": false,
        "seccompProfile": default_seccomp_profile(),
    })
}

/// Compute patches for one container collection.
///
/// `prefix` points at the collection, e.g. `/spec/containers`. Patch paths
/// use each container's position in `containers`.
pub fn default_containers(prefix: &Pointer, containers: &[ContainerSecurityView]) -> Vec<PatchOperation> {
    let mut patches = Vec::new();

    for (index, container) in containers.iter().enumerate() {
        let mut path = prefix.to_buf();
        path.push_back(index.to_string());
        path.push_back("securityContext");

        let Some(security) = &container.security_context else {
            patches.push(add(path, default_security_context()));
            continue;
        };

        let field = |name: &str| {
            let mut field_path: PointerBuf = path.clone();
            field_path.push_back(name);
            field_path
        };

        if security.allow_privilege_escalation.is_none() {
            patches.push(add(field("allowPrivilegeEscalation"), Value::Bool(false)));
        }
        // Only a missing capabilities object is defaulted; an existing one
        // without a drop list is left alone.
        if security.capabilities.is_none() {
            patches.push(add(field("capabilities"), default_capabilities()));
        }
        if security.seccomp_profile.is_none() {
            patches.push(add(field("seccompProfile"), default_seccomp_profile()));
        }
    }

    patches
}
