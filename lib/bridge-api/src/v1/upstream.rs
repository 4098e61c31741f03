use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Upstream is a backend destination the gateway can route traffic to
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "routing.ingress-bridge.io",
    version = "v1",
    kind = "Upstream",
    plural = "upstreams",
    namespaced,
    derive = "Default",
    derive = "PartialEq"
)]
pub struct UpstreamSpec {
    /// Backend kind this upstream points at
    #[serde(rename = "type")]
    pub upstream_type: UpstreamType,

    /// Service coordinates for `kubernetes` upstreams
    pub kubernetes: KubernetesUpstreamSpec,
}

/// Kind of backend an upstream resolves to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum UpstreamType {
    /// A cluster Service addressed by name, namespace and port
    #[default]
    Kubernetes,
}

impl UpstreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamType::Kubernetes => "kubernetes",
        }
    }
}

/// A cluster Service backend
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesUpstreamSpec {
    /// Name of the Service
    pub service_name: String,

    /// Namespace of the Service
    pub service_namespace: String,

    /// Port number or port name on the Service
    pub service_port: String,
}

impl UpstreamSpec {
    /// Spec for a cluster Service backend
    pub fn kubernetes(
        service_name: impl Into<String>,
        service_namespace: impl Into<String>,
        service_port: impl Into<String>,
    ) -> Self {
        Self {
            upstream_type: UpstreamType::Kubernetes,
            kubernetes: KubernetesUpstreamSpec {
                service_name: service_name.into(),
                service_namespace: service_namespace.into(),
                service_port: service_port.into(),
            },
        }
    }
}
