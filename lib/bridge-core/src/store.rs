//! Persisted resource store seam

use async_trait::async_trait;

/// List, create, update and delete access to one stored resource kind.
///
/// Each call is attempted once; retries and timeouts belong to the
/// implementation.
#[async_trait]
pub trait ResourceStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// All records of this kind in the target namespace
    async fn list(&self) -> kube::Result<Vec<K>>;

    async fn create(&self, resource: &K) -> kube::Result<K>;

    /// Replace a record; the payload carries the stored resource version
    async fn update(&self, resource: &K) -> kube::Result<K>;

    async fn delete(&self, name: &str) -> kube::Result<()>;
}
