//! Ingress event source seam and the typed change envelope

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;

/// Lists the full current ingress set
#[async_trait]
pub trait IngressSource: Send + Sync {
    async fn list(&self) -> kube::Result<Vec<Ingress>>;
}

/// What happened to an ingress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Applied,
    Deleted,
}

/// Change notification for a single ingress
#[derive(Clone, Debug)]
pub struct IngressEvent {
    pub kind: EventKind,
    pub namespace: String,
    pub name: String,
    /// Object as last observed; the final state for deletions
    pub ingress: Ingress,
}

impl IngressEvent {
    pub fn new(kind: EventKind, ingress: Ingress) -> Self {
        Self {
            kind,
            namespace: ingress.namespace().unwrap_or_default(),
            name: ingress.name_any(),
            ingress,
        }
    }

    pub fn applied(ingress: Ingress) -> Self {
        Self::new(EventKind::Applied, ingress)
    }

    pub fn deleted(ingress: Ingress) -> Self {
        Self::new(EventKind::Deleted, ingress)
    }
}

/// Item yielded by an ingress watch
#[derive(Clone, Debug)]
pub enum SourceEvent {
    /// A single ingress changed
    Changed(IngressEvent),
    /// The watch re-listed every ingress and changes may have been missed
    Relisted,
}

impl From<IngressEvent> for SourceEvent {
    fn from(event: IngressEvent) -> Self {
        SourceEvent::Changed(event)
    }
}
