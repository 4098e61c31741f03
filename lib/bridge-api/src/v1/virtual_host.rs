use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VirtualHost groups a domain with its ordered routes
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "routing.ingress-bridge.io",
    version = "v1",
    kind = "VirtualHost",
    plural = "virtualhosts",
    namespaced,
    derive = "Default",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHostSpec {
    /// Domains served by this virtual host ("*" matches any host)
    pub domains: Vec<String>,

    /// Routes in dispatch order, first match wins
    #[serde(default)]
    pub routes: Vec<Route>,

    /// TLS termination for the domains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_config: Option<SslConfig>,
}

/// A request matcher and the upstream it dispatches to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Route {
    pub matcher: PathMatch,
    pub destination: Destination,
}

/// HTTP path matcher
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PathMatch {
    /// Path must equal the value
    Exact(String),
    /// Path must start with the value
    Prefix(String),
    /// Path must match the regular expression
    Regex(String),
}

impl PathMatch {
    /// The raw path or pattern string
    pub fn path(&self) -> &str {
        match self {
            PathMatch::Exact(p) | PathMatch::Prefix(p) | PathMatch::Regex(p) => p,
        }
    }
}

/// Route destination
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Name of an Upstream in the same namespace
    pub upstream_name: String,
}

impl Route {
    pub fn new(matcher: PathMatch, upstream_name: impl Into<String>) -> Self {
        Self {
            matcher,
            destination: Destination {
                upstream_name: upstream_name.into(),
            },
        }
    }

    pub fn path(&self) -> &str {
        self.matcher.path()
    }
}

/// TLS termination settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SslConfig {
    /// Name of the Secret holding the certificate and key
    pub secret_ref: String,
}
