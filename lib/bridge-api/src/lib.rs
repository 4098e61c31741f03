//! Routing model resources produced by the ingress bridge
//!
//! This library defines the custom resources consumed by the gateway control plane:
//! - Upstream: a backend service destination
//! - VirtualHost: a domain with its ordered routes and optional TLS termination

pub mod v1;

pub use v1::{Upstream, VirtualHost};
