//! Name-keyed diff engine shared by every generated resource kind

use crate::error::{CoreError, Operation, Result};
use crate::store::ResourceStore;
use bridge_api::v1::{Upstream, VirtualHost};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::{debug, info};

/// A resource the diff engine can converge
pub trait Reconcilable: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static {
    /// Kind name used in logs and errors
    const KIND: &'static str;

    /// Structural equality of the managed spec, ignoring metadata
    fn spec_matches(&self, other: &Self) -> bool;
}

impl Reconcilable for Upstream {
    const KIND: &'static str = "Upstream";

    fn spec_matches(&self, other: &Self) -> bool {
        self.spec == other.spec
    }
}

impl Reconcilable for VirtualHost {
    const KIND: &'static str = "VirtualHost";

    fn spec_matches(&self, other: &Self) -> bool {
        self.spec == other.spec
    }
}

/// Operations needed to turn the actual set into the desired set
#[derive(Debug)]
pub struct Plan<K> {
    /// Desired resources with no stored counterpart
    pub create: Vec<K>,
    /// Desired resources whose stored spec differs, carrying the stored version
    pub update: Vec<K>,
    /// Names of stored resources that are no longer desired
    pub delete: Vec<String>,
    /// Names whose stored spec already matches
    pub unchanged: Vec<String>,
}

impl<K: Reconcilable> Plan<K> {
    /// Diff desired against actual by resource name
    pub fn compute(desired: Vec<K>, actual: Vec<K>) -> Self {
        let mut remaining: BTreeMap<String, K> = actual
            .into_iter()
            .map(|resource| (resource.name_any(), resource))
            .collect();

        let mut create = Vec::new();
        let mut update = Vec::new();
        let mut unchanged = Vec::new();

        for mut resource in desired {
            let name = resource.name_any();
            match remaining.remove(&name) {
                None => create.push(resource),
                Some(existing) if resource.spec_matches(&existing) => unchanged.push(name),
                Some(existing) => {
                    let meta = resource.meta_mut();
                    meta.resource_version = existing.meta().resource_version.clone();
                    meta.uid = existing.meta().uid.clone();
                    update.push(resource);
                }
            }
        }

        Self {
            create,
            update,
            delete: remaining.into_keys().collect(),
            unchanged,
        }
    }

    /// Whether no writes are needed
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Counts of what one sync did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl SyncSummary {
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Apply a plan: creates, then updates, then deletes.
///
/// The first failing write aborts the rest; nothing already applied is rolled back.
pub async fn apply<K, S>(store: &S, plan: Plan<K>) -> Result<SyncSummary>
where
    K: Reconcilable,
    S: ResourceStore<K> + ?Sized,
{
    let mut summary = SyncSummary {
        unchanged: plan.unchanged.len(),
        ..Default::default()
    };

    for resource in &plan.create {
        let name = resource.name_any();
        store
            .create(resource)
            .await
            .map_err(|source| write_error::<K>(Operation::Create, &name, source))?;
        info!("Created {} {}", K::KIND, name);
        summary.created += 1;
    }

    for resource in &plan.update {
        let name = resource.name_any();
        store
            .update(resource)
            .await
            .map_err(|source| write_error::<K>(Operation::Update, &name, source))?;
        info!("Updated {} {}", K::KIND, name);
        summary.updated += 1;
    }

    for name in &plan.delete {
        store
            .delete(name)
            .await
            .map_err(|source| write_error::<K>(Operation::Delete, name, source))?;
        info!("Deleted {} {}", K::KIND, name);
        summary.deleted += 1;
    }

    Ok(summary)
}

/// List the stored resources of one kind
pub async fn list_actual<K, S>(store: &S) -> Result<Vec<K>>
where
    K: Reconcilable,
    S: ResourceStore<K> + ?Sized,
{
    let actual = store.list().await.map_err(|source| CoreError::ListResources {
        kind: K::KIND,
        source,
    })?;
    debug!("Listed {} stored {} resources", actual.len(), K::KIND);
    Ok(actual)
}

/// Diff `desired` against `actual` and apply the result
pub async fn converge<K, S>(store: &S, desired: Vec<K>, actual: Vec<K>) -> Result<SyncSummary>
where
    K: Reconcilable,
    S: ResourceStore<K> + ?Sized,
{
    let plan = Plan::compute(desired, actual);
    debug!(
        "{} plan: {} to create, {} to update, {} to delete, {} unchanged",
        K::KIND,
        plan.create.len(),
        plan.update.len(),
        plan.delete.len(),
        plan.unchanged.len()
    );

    apply(store, plan).await
}

fn write_error<K: Reconcilable>(op: Operation, name: &str, source: kube::Error) -> CoreError {
    CoreError::Write {
        op,
        kind: K::KIND,
        name: name.to_string(),
        source,
    }
}
