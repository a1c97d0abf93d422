//! Read-only projection of the security-relevant parts of a Pod.
//!
//! The view is built once per request and only ever borrowed by the policy.

use k8s_openapi::api::core::v1::{Container, Pod, PodSecurityContext, SecurityContext};

/// Pod-wide `runAsNonRoot` / `runAsUser` settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodPosture {
    pub run_as_non_root: Option<bool>,
    pub run_as_user: Option<i64>,
}

/// Container capability adjustments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    pub add: Vec<String>,
    pub drop: Vec<String>,
}

/// Hardening settings of a single container's `securityContext`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSecurity {
    pub allow_privilege_escalation: Option<bool>,
    pub capabilities: Option<CapabilitySet>,
    /// Seccomp profile type, e.g. `RuntimeDefault`
    pub seccomp_profile: Option<String>,
}

/// A container as seen by the policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSecurityView {
    /// `None` when the container has no `securityContext` at all
    pub security_context: Option<ContainerSecurity>,
}

impl ContainerSecurityView {
    /// A container without any `securityContext`
    pub fn bare() -> Self {
        Self::default()
    }

    /// A container with the given `securityContext`
    pub fn with_context(security: ContainerSecurity) -> Self {
        Self {
            security_context: Some(security),
        }
    }
}

/// Everything the policy needs to know about a pod
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodSecurityView {
    /// `None` when `spec.securityContext` is absent
    pub security_context: Option<PodPosture>,
    pub containers: Vec<ContainerSecurityView>,
    pub init_containers: Vec<ContainerSecurityView>,
}

impl PodSecurityView {
    /// Pod-wide posture, treating a missing `securityContext` as all-unset
    pub fn posture(&self) -> PodPosture {
        self.security_context.clone().unwrap_or_default()
    }
}

impl From<&PodSecurityContext> for PodPosture {
    fn from(ctx: &PodSecurityContext) -> Self {
        Self {
            run_as_non_root: ctx.run_as_non_root,
            run_as_user: ctx.run_as_user,
        }
    }
}

impl From<&SecurityContext> for ContainerSecurity {
    fn from(ctx: &SecurityContext) -> Self {
        Self {
            allow_privilege_escalation: ctx.allow_privilege_escalation,
            capabilities: ctx.capabilities.as_ref().map(|caps| CapabilitySet {
                add: caps.add.clone().unwrap_or_default(),
                drop: caps.drop.clone().unwrap_or_default(),
            }),
            seccomp_profile: ctx.seccomp_profile.as_ref().map(|p| p.type_.clone()),
        }
    }
}

impl From<&Container> for ContainerSecurityView {
    fn from(container: &Container) -> Self {
        Self {
            security_context: container.security_context.as_ref().map(ContainerSecurity::from),
        }
    }
}

impl From<&Pod> for PodSecurityView {
    fn from(pod: &Pod) -> Self {
        let Some(spec) = pod.spec.as_ref() else {
            return Self::default();
        };

        let project = |containers: &[Container]| {
            containers
                .iter()
                .map(ContainerSecurityView::from)
                .collect::<Vec<_>>()
        };

        Self {
            security_context: spec.security_context.as_ref().map(PodPosture::from),
            containers: project(&spec.containers),
            init_containers: spec
                .init_containers
                .as_deref()
                .map(project)
                .unwrap_or_default(),
        }
    }
}
