//! In-memory stand-ins for the cluster used by unit tests

use crate::config::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::error::{CoreError, Operation};
use crate::reconciler::Reconcilable;
use crate::sink::ErrorSink;
use crate::source::IngressSource;
use crate::store::ResourceStore;
use async_trait::async_trait;
use bridge_api::v1::{Upstream, UpstreamSpec};
use k8s_openapi::api::core::v1::TypedLocalObjectReference;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("injected {}", reason),
        reason: reason.to_string(),
        code,
    })
}

/// Upstream named `name` pointing at `service` port 80 in namespace `shop`
pub fn upstream(name: &str, service: &str) -> Upstream {
    Upstream {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("gateway".to_string()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            ..Default::default()
        },
        spec: UpstreamSpec::kubernetes(service, "shop", "80"),
    }
}

struct StoreState<K> {
    items: BTreeMap<String, K>,
    operations: Vec<(Operation, String)>,
    fail_on: Option<(Operation, String)>,
    fail_list: bool,
    version: u64,
}

/// Store with optimistic concurrency on resource versions
pub struct MemoryStore<K> {
    state: Mutex<StoreState<K>>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            state: Mutex::new(StoreState {
                items: BTreeMap::new(),
                operations: Vec::new(),
                fail_on: None,
                fail_list: false,
                version: 0,
            }),
        }
    }
}

impl<K: Reconcilable> MemoryStore<K> {
    pub fn with(items: Vec<K>) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for mut item in items {
                state.version += 1;
                item.meta_mut().resource_version = Some(state.version.to_string());
                state.items.insert(item.name_any(), item);
            }
        }
        store
    }

    pub fn get(&self, name: &str) -> Option<K> {
        self.state.lock().unwrap().items.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.state.lock().unwrap().items.keys().cloned().collect()
    }

    pub fn operations(&self) -> Vec<(Operation, String)> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.state.lock().unwrap().operations.clear();
    }

    pub fn fail_on(&self, op: Operation, name: &str) {
        self.state.lock().unwrap().fail_on = Some((op, name.to_string()));
    }

    pub fn fail_list(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    fn injected(state: &StoreState<K>, op: Operation, name: &str) -> kube::Result<()> {
        match &state.fail_on {
            Some((failing, failing_name)) if *failing == op && failing_name == name => {
                Err(api_error(500, "InternalError"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<K: Reconcilable> ResourceStore<K> for MemoryStore<K> {
    async fn list(&self) -> kube::Result<Vec<K>> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(api_error(503, "ServiceUnavailable"));
        }
        Ok(state.items.values().cloned().collect())
    }

    async fn create(&self, resource: &K) -> kube::Result<K> {
        let mut state = self.state.lock().unwrap();
        let name = resource.name_any();
        Self::injected(&state, Operation::Create, &name)?;
        if state.items.contains_key(&name) {
            return Err(api_error(409, "AlreadyExists"));
        }
        state.version += 1;
        let mut stored = resource.clone();
        stored.meta_mut().resource_version = Some(state.version.to_string());
        state.items.insert(name.clone(), stored.clone());
        state.operations.push((Operation::Create, name));
        Ok(stored)
    }

    async fn update(&self, resource: &K) -> kube::Result<K> {
        let mut state = self.state.lock().unwrap();
        let name = resource.name_any();
        Self::injected(&state, Operation::Update, &name)?;
        let current = state
            .items
            .get(&name)
            .ok_or_else(|| api_error(404, "NotFound"))?;
        if current.meta().resource_version != resource.meta().resource_version {
            return Err(api_error(409, "Conflict"));
        }
        state.version += 1;
        let mut stored = resource.clone();
        stored.meta_mut().resource_version = Some(state.version.to_string());
        state.items.insert(name.clone(), stored.clone());
        state.operations.push((Operation::Update, name));
        Ok(stored)
    }

    async fn delete(&self, name: &str) -> kube::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::injected(&state, Operation::Delete, name)?;
        state
            .items
            .remove(name)
            .ok_or_else(|| api_error(404, "NotFound"))?;
        state.operations.push((Operation::Delete, name.to_string()));
        Ok(())
    }
}

/// Ingress lister backed by a vector
#[derive(Default)]
pub struct StaticSource {
    ingresses: Mutex<Vec<Ingress>>,
    fail: Mutex<bool>,
    lists: Mutex<usize>,
}

impl StaticSource {
    pub fn new(ingresses: Vec<Ingress>) -> Self {
        Self {
            ingresses: Mutex::new(ingresses),
            ..Default::default()
        }
    }

    pub fn set(&self, ingresses: Vec<Ingress>) {
        *self.ingresses.lock().unwrap() = ingresses;
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn list_count(&self) -> usize {
        *self.lists.lock().unwrap()
    }
}

#[async_trait]
impl IngressSource for StaticSource {
    async fn list(&self) -> kube::Result<Vec<Ingress>> {
        *self.lists.lock().unwrap() += 1;
        if *self.fail.lock().unwrap() {
            return Err(api_error(503, "ServiceUnavailable"));
        }
        Ok(self.ingresses.lock().unwrap().clone())
    }
}

/// Sink keeping the rendered errors
#[derive(Default)]
pub struct RecordingSink {
    errors: Mutex<Vec<(bool, String)>>,
}

impl RecordingSink {
    /// (recoverable, message) pairs in report order
    pub fn errors(&self) -> Vec<(bool, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, error: CoreError) {
        self.errors
            .lock()
            .unwrap()
            .push((error.is_recoverable(), error.to_string()));
    }
}

/// Fluent construction of networking/v1 Ingresses
pub struct IngressBuilder {
    ingress: Ingress,
}

impl IngressBuilder {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            ingress: Ingress {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    namespace: Some(namespace.to_string()),
                    ..Default::default()
                },
                spec: Some(IngressSpec::default()),
                ..Default::default()
            },
        }
    }

    fn spec(&mut self) -> &mut IngressSpec {
        self.ingress.spec.get_or_insert_with(Default::default)
    }

    pub fn class(mut self, class: &str) -> Self {
        self.ingress
            .metadata
            .annotations
            .get_or_insert_with(Default::default)
            .insert(
                crate::config::INGRESS_CLASS_ANNOTATION.to_string(),
                class.to_string(),
            );
        self
    }

    pub fn default_backend(mut self, service: &str, port: i32) -> Self {
        self.spec().default_backend = Some(service_backend(service, Some(port), None));
        self
    }

    pub fn path(self, host: &str, path: &str, path_type: &str, service: &str, port: i32) -> Self {
        self.add_path(host, path, path_type, service_backend(service, Some(port), None))
    }

    pub fn named_port_path(self, host: &str, path: &str, service: &str, port: &str) -> Self {
        self.add_path(host, path, "Prefix", service_backend(service, None, Some(port)))
    }

    pub fn resource_path(self, host: &str, path: &str) -> Self {
        let backend = IngressBackend {
            resource: Some(TypedLocalObjectReference {
                api_group: Some("storage.example.com".to_string()),
                kind: "Bucket".to_string(),
                name: "assets".to_string(),
            }),
            service: None,
        };
        self.add_path(host, path, "Prefix", backend)
    }

    pub fn tls(mut self, hosts: &[&str], secret: &str) -> Self {
        let hosts: Vec<String> = hosts.iter().map(|h| h.to_string()).collect();
        self.spec().tls.get_or_insert_with(Vec::new).push(IngressTLS {
            hosts: if hosts.is_empty() { None } else { Some(hosts) },
            secret_name: Some(secret.to_string()),
        });
        self
    }

    pub fn build(self) -> Ingress {
        self.ingress
    }

    fn add_path(mut self, host: &str, path: &str, path_type: &str, backend: IngressBackend) -> Self {
        let host = if host.is_empty() { None } else { Some(host.to_string()) };
        let rules = self.spec().rules.get_or_insert_with(Vec::new);
        let index = match rules.iter().position(|r| r.host == host) {
            Some(index) => index,
            None => {
                rules.push(IngressRule {
                    host,
                    http: Some(HTTPIngressRuleValue { paths: Vec::new() }),
                });
                rules.len() - 1
            }
        };
        if let Some(http) = rules[index].http.as_mut() {
            http.paths.push(HTTPIngressPath {
                backend,
                path: Some(path.to_string()),
                path_type: path_type.to_string(),
            });
        }
        self
    }
}

fn service_backend(service: &str, number: Option<i32>, name: Option<&str>) -> IngressBackend {
    IngressBackend {
        resource: None,
        service: Some(IngressServiceBackend {
            name: service.to_string(),
            port: Some(ServiceBackendPort {
                number,
                name: name.map(String::from),
            }),
        }),
    }
}
