//! Controller options and naming constants

use k8s_openapi::api::networking::v1::Ingress;
use std::time::Duration;

/// Prefix for generated Upstream names
pub const UPSTREAM_PREFIX: &str = "ingress-bridge-upstream";
/// Prefix for generated VirtualHost names
pub const VIRTUAL_HOST_PREFIX: &str = "ingress-bridge-virtualhost";

/// Reserved name of the catch-all virtual host
pub const DEFAULT_VIRTUAL_HOST: &str = "default";
/// Domain served by the catch-all virtual host
pub const WILDCARD_DOMAIN: &str = "*";

/// Annotation selecting the ingress controller
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";
/// Class value claimed by this controller unless configured otherwise
pub const DEFAULT_INGRESS_CLASS: &str = "ingress-bridge";

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "ingress-bridge";

/// Decides which ingresses this controller translates
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Process every ingress regardless of class
    pub global: bool,
    /// Class value matched against the ingress class annotation
    pub ingress_class: String,
}

impl SelectionPolicy {
    pub fn new(global: bool, ingress_class: impl Into<String>) -> Self {
        Self {
            global,
            ingress_class: ingress_class.into(),
        }
    }

    /// Whether the ingress belongs to this controller.
    ///
    /// The class annotation takes precedence; `spec.ingressClassName` is
    /// consulted only when the annotation is absent.
    pub fn selects(&self, ingress: &Ingress) -> bool {
        if self.global {
            return true;
        }

        let annotated = ingress
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(INGRESS_CLASS_ANNOTATION));

        let class = match annotated {
            Some(class) => Some(class),
            None => ingress
                .spec
                .as_ref()
                .and_then(|s| s.ingress_class_name.as_ref()),
        };

        class.map(|c| c == &self.ingress_class).unwrap_or(false)
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::new(false, DEFAULT_INGRESS_CLASS)
    }
}

/// Runtime options for the controller loop
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Interval between full resync passes
    pub resync_interval: Duration,
    /// Namespace generated resources are written to
    pub target_namespace: String,
    /// Ingress selection
    pub selection: SelectionPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval: Duration::from_secs(300),
            target_namespace: "ingress-bridge-system".to_string(),
            selection: SelectionPolicy::default(),
        }
    }
}
