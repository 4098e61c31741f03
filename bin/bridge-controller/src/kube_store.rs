//! ResourceStore backed by the Kubernetes API

use async_trait::async_trait;
use bridge_core::{Reconcilable, ResourceStore};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Generated resources of one kind in the target namespace
pub struct KubeStore<K> {
    api: Api<K>,
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    pub fn namespaced(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait]
impl<K> ResourceStore<K> for KubeStore<K>
where
    K: Reconcilable + Resource<Scope = NamespaceResourceScope> + Serialize + DeserializeOwned,
{
    async fn list(&self) -> kube::Result<Vec<K>> {
        let list = self.api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn create(&self, resource: &K) -> kube::Result<K> {
        self.api.create(&PostParams::default(), resource).await
    }

    async fn update(&self, resource: &K) -> kube::Result<K> {
        self.api
            .replace(&resource.name_any(), &PostParams::default(), resource)
            .await
    }

    async fn delete(&self, name: &str) -> kube::Result<()> {
        let result = self.api.delete(name, &DeleteParams::default()).await?;
        if result.is_left() {
            debug!("{} {} is pending deletion", K::KIND, name);
        }
        Ok(())
    }
}
