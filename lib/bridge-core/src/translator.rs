//! Derives the desired routing model from the current set of Ingresses

use crate::config::{
    ControllerConfig, SelectionPolicy, DEFAULT_VIRTUAL_HOST, MANAGED_BY_LABEL, MANAGED_BY_VALUE,
    UPSTREAM_PREFIX, VIRTUAL_HOST_PREFIX, WILDCARD_DOMAIN,
};
use crate::error::CoreError;
use bridge_api::v1::{
    PathMatch, Route, SslConfig, Upstream, UpstreamSpec, VirtualHost, VirtualHostSpec,
};
use k8s_openapi::api::networking::v1::{HTTPIngressPath, Ingress, IngressBackend};
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Desired state computed by one translation
#[derive(Debug, Default)]
pub struct Translation {
    /// Upstreams ordered by name
    pub upstreams: Vec<Upstream>,
    /// VirtualHosts ordered by host, default host first
    pub virtual_hosts: Vec<VirtualHost>,
    /// Recoverable configuration conflicts found along the way
    pub conflicts: Vec<CoreError>,
}

/// Host a route is attached to
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum HostKey {
    Default,
    Named(String),
}

impl HostKey {
    fn from_rule(host: Option<&str>) -> Self {
        match host {
            Some(h) if !h.is_empty() => HostKey::Named(h.to_string()),
            _ => HostKey::Default,
        }
    }

    fn domain(&self) -> &str {
        match self {
            HostKey::Default => WILDCARD_DOMAIN,
            HostKey::Named(host) => host,
        }
    }

    fn resource_name(&self) -> String {
        match self {
            HostKey::Default => DEFAULT_VIRTUAL_HOST.to_string(),
            HostKey::Named(host) => virtual_host_name(host),
        }
    }
}

/// Pure translation from Ingresses to Upstreams and VirtualHosts
#[derive(Clone, Debug)]
pub struct Translator {
    selection: SelectionPolicy,
    target_namespace: String,
}

impl Translator {
    pub fn new(selection: SelectionPolicy, target_namespace: impl Into<String>) -> Self {
        Self {
            selection,
            target_namespace: target_namespace.into(),
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.selection.clone(), config.target_namespace.clone())
    }

    pub fn selection(&self) -> &SelectionPolicy {
        &self.selection
    }

    /// Translate the full ingress set into the desired routing model.
    ///
    /// Selected ingresses are processed in descending name order. A default
    /// backend is dropped as a conflict once an earlier ingress has put any
    /// route on the default host, whether from its own default backend or
    /// from a hostless rule.
    pub fn translate(&self, ingresses: &[Ingress]) -> Translation {
        let mut selected: Vec<&Ingress> = ingresses
            .iter()
            .filter(|ingress| {
                let ours = self.selection.selects(ingress);
                if !ours {
                    trace!(
                        "Skipping ingress {}/{}: not ours",
                        ingress.namespace().unwrap_or_default(),
                        ingress.name_any()
                    );
                }
                ours
            })
            .collect();
        selected.sort_by(|a, b| {
            b.name_any()
                .cmp(&a.name_any())
                .then_with(|| b.namespace().cmp(&a.namespace()))
        });

        let mut upstreams: BTreeMap<String, UpstreamSpec> = BTreeMap::new();
        let mut routes: BTreeMap<HostKey, Vec<Route>> = BTreeMap::new();
        let mut ssl_configs: BTreeMap<HostKey, SslConfig> = BTreeMap::new();
        // first ingress to put a route on the default host
        let mut default_host_owner: Option<String> = None;
        let mut conflicts = Vec::new();

        for ingress in selected {
            let name = ingress.name_any();
            let namespace = ingress.namespace().unwrap_or_default();
            let Some(spec) = ingress.spec.as_ref() else {
                continue;
            };

            for tls in spec.tls.iter().flatten() {
                let Some(secret) = tls.secret_name.as_ref() else {
                    continue;
                };
                let ssl = SslConfig {
                    secret_ref: secret.clone(),
                };
                let hosts = tls.hosts.as_deref().unwrap_or_default();
                if hosts.is_empty() {
                    ssl_configs.insert(HostKey::Default, ssl);
                    continue;
                }
                for host in hosts {
                    if let Some(previous) = ssl_configs.insert(HostKey::from_rule(Some(host.as_str())), ssl.clone()) {
                        if previous != ssl {
                            debug!(
                                "TLS secret for host {} replaced by {}/{}",
                                host, namespace, name
                            );
                        }
                    }
                }
            }

            if let Some(backend) = spec.default_backend.as_ref() {
                if let Some(owner) = &default_host_owner {
                    let conflict = CoreError::DefaultBackendConflict {
                        namespace: namespace.clone(),
                        name: name.clone(),
                    };
                    debug!(winner = %owner, "{}", conflict);
                    conflicts.push(conflict);
                } else if let Some((upstream_name, upstream)) =
                    upstream_for_backend(&namespace, backend)
                {
                    upstreams.insert(upstream_name.clone(), upstream);
                    routes
                        .entry(HostKey::Default)
                        .or_default()
                        .push(Route::new(PathMatch::Prefix("/".to_string()), upstream_name));
                    default_host_owner = Some(format!("{}/{}", namespace, name));
                } else {
                    debug!(
                        "Default backend of {}/{} is not a service port, ignoring",
                        namespace, name
                    );
                }
            }

            for rule in spec.rules.iter().flatten() {
                let Some(http) = rule.http.as_ref() else {
                    continue;
                };
                let host = HostKey::from_rule(rule.host.as_deref());
                for path in &http.paths {
                    let Some((upstream_name, upstream)) =
                        upstream_for_backend(&namespace, &path.backend)
                    else {
                        debug!(
                            "Backend for path {:?} in {}/{} is not a service port, ignoring",
                            path.path, namespace, name
                        );
                        continue;
                    };
                    upstreams.insert(upstream_name.clone(), upstream);
                    if host == HostKey::Default && default_host_owner.is_none() {
                        default_host_owner = Some(format!("{}/{}", namespace, name));
                    }
                    routes
                        .entry(host.clone())
                        .or_default()
                        .push(Route::new(path_match(path), upstream_name));
                }
            }
        }

        let upstreams = upstreams
            .into_iter()
            .map(|(name, spec)| Upstream {
                metadata: self.object_meta(name),
                spec,
            })
            .collect();

        let virtual_hosts = routes
            .into_iter()
            .map(|(host, mut routes)| {
                sort_routes(&mut routes);
                VirtualHost {
                    metadata: self.object_meta(host.resource_name()),
                    spec: VirtualHostSpec {
                        // an ingress rule names a single host
                        domains: vec![host.domain().to_string()],
                        routes,
                        ssl_config: ssl_configs.get(&host).cloned(),
                    },
                }
            })
            .collect();

        Translation {
            upstreams,
            virtual_hosts,
            conflicts,
        }
    }

    fn object_meta(&self, name: String) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.target_namespace.clone()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            ..Default::default()
        }
    }
}

/// Deterministic Upstream name for a service port
pub fn upstream_name(namespace: &str, service: &str, port: &str) -> String {
    format!("{}-{}-{}-{}", UPSTREAM_PREFIX, namespace, service, port)
}

/// VirtualHost name for a named host
pub fn virtual_host_name(host: &str) -> String {
    format!("{}-{}", VIRTUAL_HOST_PREFIX, host.replace('*', "wildcard"))
}

/// Order routes so the most specific path is matched first:
/// longer paths first, equal lengths in ascending lexicographic order
pub fn sort_routes(routes: &mut [Route]) {
    routes.sort_by(|a, b| {
        b.path()
            .len()
            .cmp(&a.path().len())
            .then_with(|| a.path().cmp(b.path()))
    });
}

fn upstream_for_backend(namespace: &str, backend: &IngressBackend) -> Option<(String, UpstreamSpec)> {
    let service = backend.service.as_ref()?;
    let port = service.port.as_ref()?;
    let port = match (&port.number, &port.name) {
        (Some(number), _) => number.to_string(),
        (None, Some(name)) if !name.is_empty() => name.clone(),
        _ => return None,
    };

    let name = upstream_name(namespace, &service.name, &port);
    Some((name, UpstreamSpec::kubernetes(&service.name, namespace, port)))
}

fn path_match(path: &HTTPIngressPath) -> PathMatch {
    let value = path.path.clone().unwrap_or_else(|| "/".to_string());
    match path.path_type.as_str() {
        "Exact" => PathMatch::Exact(value),
        "Prefix" => PathMatch::Prefix(value),
        _ => PathMatch::Regex(value),
    }
}
