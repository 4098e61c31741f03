/// API version v1 for ingress bridge routing resources

pub mod upstream;
pub mod virtual_host;

pub use upstream::{KubernetesUpstreamSpec, Upstream, UpstreamSpec, UpstreamType};
pub use virtual_host::{Destination, PathMatch, Route, SslConfig, VirtualHost, VirtualHostSpec};

/// API group for routing resources
pub const API_GROUP: &str = "routing.ingress-bridge.io";
/// API version for routing resources
pub const API_VERSION: &str = "v1";
