//! Ingress list and watch backed by the Kubernetes API

use async_trait::async_trait;
use bridge_core::{IngressEvent, IngressSource, SourceEvent};
use futures::{future, Stream, StreamExt};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ListParams;
use kube::{Api, Client};
use kube_runtime::watcher::{self, Event};
use kube_runtime::WatchStreamExt;
use tracing::{debug, warn};

/// Cluster-wide Ingresses, optionally narrowed by a label selector
pub struct KubeIngressSource {
    api: Api<Ingress>,
    label_selector: Option<String>,
}

impl KubeIngressSource {
    pub fn new(client: Client, label_selector: Option<String>) -> Self {
        Self {
            api: Api::all(client),
            label_selector,
        }
    }

    /// Change notifications as typed events.
    ///
    /// Watch errors are logged and skipped; the watcher backs off and
    /// re-lists on its own.
    pub fn watch(&self) -> impl Stream<Item = SourceEvent> + Send + 'static {
        let mut config = watcher::Config::default();
        if let Some(selector) = &self.label_selector {
            config = config.labels(selector);
        }

        watcher::watcher(self.api.clone(), config)
            .default_backoff()
            .filter_map(|event| future::ready(source_event(event)))
    }
}

/// Map a raw watcher event onto the controller's event type.
///
/// Initial-list pages carry nothing the re-list marker does not, and watch
/// errors are logged and dropped.
fn source_event(event: watcher::Result<Event<Ingress>>) -> Option<SourceEvent> {
    match event {
        Ok(Event::Apply(ingress)) => Some(IngressEvent::applied(ingress).into()),
        Ok(Event::Delete(ingress)) => Some(IngressEvent::deleted(ingress).into()),
        Ok(Event::InitDone) => {
            debug!("Ingress watch (re)listed");
            Some(SourceEvent::Relisted)
        }
        Ok(Event::Init) | Ok(Event::InitApply(_)) => None,
        Err(e) => {
            warn!("Ingress watch error: {}", e);
            None
        }
    }
}

#[async_trait]
impl IngressSource for KubeIngressSource {
    async fn list(&self) -> kube::Result<Vec<Ingress>> {
        let mut params = ListParams::default();
        if let Some(selector) = &self.label_selector {
            params = params.labels(selector);
        }
        let list = self.api.list(&params).await?;
        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::EventKind;
    use kube::api::ObjectMeta;
    use kube::error::ErrorResponse;

    fn ingress(name: &str) -> Ingress {
        Ingress {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("shop".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn changed(event: Option<SourceEvent>) -> (EventKind, String, String) {
        match event {
            Some(SourceEvent::Changed(e)) => (e.kind, e.namespace, e.name),
            other => panic!("expected a change event, got {:?}", other),
        }
    }

    #[test]
    fn test_apply_and_delete_become_changes() {
        assert_eq!(
            changed(source_event(Ok(Event::Apply(ingress("web"))))),
            (EventKind::Applied, "shop".to_string(), "web".to_string())
        );
        assert_eq!(
            changed(source_event(Ok(Event::Delete(ingress("web"))))),
            (EventKind::Deleted, "shop".to_string(), "web".to_string())
        );
    }

    #[test]
    fn test_init_done_becomes_relist() {
        assert!(matches!(
            source_event(Ok(Event::InitDone)),
            Some(SourceEvent::Relisted)
        ));
    }

    #[test]
    fn test_initial_list_pages_are_skipped() {
        assert!(source_event(Ok(Event::Init)).is_none());
        assert!(source_event(Ok(Event::InitApply(ingress("web")))).is_none());
    }

    #[test]
    fn test_watch_errors_are_skipped() {
        let error = watcher::Error::WatchError(ErrorResponse {
            status: "Failure".to_string(),
            message: "too old resource version".to_string(),
            reason: "Expired".to_string(),
            code: 410,
        });

        assert!(source_event(Err(error)).is_none());
    }
}
