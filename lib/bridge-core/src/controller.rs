//! Level-triggered controller loop
//!
//! Every trigger, whether an ingress change, a watch re-list or the resync
//! timer, runs one full pass: the desired state is derived from the complete
//! ingress set, never from the object that changed.

use crate::config::ControllerConfig;
use crate::error::{CoreError, Result};
use crate::metrics::ControllerMetrics;
use crate::reconciler::{self, SyncSummary};
use crate::sink::ErrorSink;
use crate::source::{IngressEvent, IngressSource, SourceEvent};
use crate::store::ResourceStore;
use crate::translator::Translator;
use bridge_api::v1::{Upstream, VirtualHost};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// Outcome of one successful pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Ingresses listed, selected or not
    pub ingresses: usize,
    pub conflicts: usize,
    pub upstreams: SyncSummary,
    pub virtual_hosts: SyncSummary,
}

/// Keeps Upstreams and VirtualHosts converged with the cluster's Ingresses
pub struct IngressController {
    config: ControllerConfig,
    translator: Translator,
    source: Arc<dyn IngressSource>,
    upstreams: Arc<dyn ResourceStore<Upstream>>,
    virtual_hosts: Arc<dyn ResourceStore<VirtualHost>>,
    sink: Arc<dyn ErrorSink>,
    metrics: ControllerMetrics,
}

impl IngressController {
    pub fn new(
        config: ControllerConfig,
        source: Arc<dyn IngressSource>,
        upstreams: Arc<dyn ResourceStore<Upstream>>,
        virtual_hosts: Arc<dyn ResourceStore<VirtualHost>>,
        sink: Arc<dyn ErrorSink>,
        metrics: ControllerMetrics,
    ) -> Self {
        Self {
            translator: Translator::from_config(&config),
            config,
            source,
            upstreams,
            virtual_hosts,
            sink,
            metrics,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &ControllerMetrics {
        &self.metrics
    }

    /// Whether a change notification should start a pass
    pub fn is_relevant(&self, event: &IngressEvent) -> bool {
        self.translator.selection().selects(&event.ingress)
    }

    /// Derive the desired state and converge both resource kinds toward it.
    ///
    /// Upstreams are converged before VirtualHosts so routes never point at
    /// an upstream that does not exist yet. Conflicts are reported to the
    /// sink and do not fail the pass.
    pub async fn run_pass(&self) -> Result<PassSummary> {
        let ingresses = self
            .source
            .list()
            .await
            .map_err(CoreError::ListIngresses)?;

        let translation = self.translator.translate(&ingresses);
        debug!(
            "Translated {} ingresses into {} upstreams and {} virtual hosts",
            ingresses.len(),
            translation.upstreams.len(),
            translation.virtual_hosts.len()
        );

        let conflicts = translation.conflicts.len();
        for conflict in translation.conflicts {
            self.metrics.conflicts_total.inc();
            self.sink.report(conflict);
        }

        let actual_upstreams =
            reconciler::list_actual::<Upstream, _>(self.upstreams.as_ref()).await?;
        let actual_virtual_hosts =
            reconciler::list_actual::<VirtualHost, _>(self.virtual_hosts.as_ref()).await?;

        let upstreams = reconciler::converge(
            self.upstreams.as_ref(),
            translation.upstreams,
            actual_upstreams,
        )
        .await?;
        self.metrics.record_sync("Upstream", &upstreams);

        let virtual_hosts = reconciler::converge(
            self.virtual_hosts.as_ref(),
            translation.virtual_hosts,
            actual_virtual_hosts,
        )
        .await?;
        self.metrics.record_sync("VirtualHost", &virtual_hosts);

        Ok(PassSummary {
            ingresses: ingresses.len(),
            conflicts,
            upstreams,
            virtual_hosts,
        })
    }

    /// Run one pass, recording its outcome and reporting any failure
    async fn pass(&self, trigger: &str) {
        debug!("Starting pass ({})", trigger);
        let started = Instant::now();
        let result = self.run_pass().await;
        self.metrics
            .pass_duration_seconds
            .observe(started.elapsed().as_secs_f64());
        self.metrics.record_pass(result.is_ok());

        match result {
            Ok(summary) => {
                if summary.upstreams.writes() + summary.virtual_hosts.writes() > 0 {
                    info!(
                        "Pass ({}) applied {} upstream and {} virtual host changes",
                        trigger,
                        summary.upstreams.writes(),
                        summary.virtual_hosts.writes()
                    );
                } else {
                    debug!("Pass ({}) found nothing to change", trigger);
                }
            }
            Err(e) => {
                debug!("Pass ({}) failed", trigger);
                self.sink.report(e);
            }
        }
    }

    /// Run passes on every qualifying event and on each resync tick until
    /// `shutdown` turns true or its sender is dropped.
    ///
    /// A pass that has started always runs to completion.
    pub async fn run<S>(&self, events: S, mut shutdown: watch::Receiver<bool>)
    where
        S: Stream<Item = SourceEvent> + Send,
    {
        if *shutdown.borrow() {
            return;
        }

        info!(
            "Starting ingress controller (resync every {:?}, writing to namespace {})",
            self.config.resync_interval, self.config.target_namespace
        );

        let mut resync = tokio::time::interval(self.config.resync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events = std::pin::pin!(events);
        let mut watching = true;

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping ingress controller");
                        break;
                    }
                }
                _ = resync.tick() => self.pass("resync").await,
                event = events.next(), if watching => match event {
                    Some(SourceEvent::Changed(event)) if self.is_relevant(&event) => {
                        let trigger = format!("{:?} {}/{}", event.kind, event.namespace, event.name);
                        self.pass(&trigger).await;
                    }
                    Some(SourceEvent::Changed(event)) => {
                        trace!("Ignoring change to {}/{}: not ours", event.namespace, event.name);
                    }
                    Some(SourceEvent::Relisted) => self.pass("relist").await,
                    None => {
                        warn!("Ingress watch ended, continuing with periodic resync only");
                        watching = false;
                    }
                },
            }
        }
    }
}
