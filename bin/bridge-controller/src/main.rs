use anyhow::Result;
use bridge_api::{Upstream, VirtualHost};
use bridge_core::{ChannelSink, ControllerMetrics, ErrorSink, IngressController, LogSink};
use clap::Parser;
use kube::{Client, CustomResourceExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod args;
mod ingress_source;
mod kube_store;
mod metrics_server;

use args::{Args, LogFormat};
use ingress_source::KubeIngressSource;
use kube_store::KubeStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_crds {
        print!("{}", crd_manifests()?);
        return Ok(());
    }

    init_tracing(args.log_format);

    info!("Starting bridge-controller...");

    let config = args.controller_config();
    let client = Client::try_default().await?;

    let source = Arc::new(KubeIngressSource::new(
        client.clone(),
        args.ingress_selector.clone(),
    ));
    let events = source.watch();
    let upstreams = Arc::new(KubeStore::<Upstream>::namespaced(
        client.clone(),
        &config.target_namespace,
    ));
    let virtual_hosts = Arc::new(KubeStore::<VirtualHost>::namespaced(
        client,
        &config.target_namespace,
    ));

    // Drain pass errors into the log
    let (sink, mut errors) = ChannelSink::new(args.error_buffer);
    tokio::spawn(async move {
        while let Some(e) = errors.recv().await {
            LogSink.report(e);
        }
    });

    let metrics = ControllerMetrics::new()?;
    let metrics_addr = args.metrics_addr;
    let server_metrics = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = metrics_server::serve(metrics_addr, server_metrics).await {
            error!("Metrics server error: {}", e);
        }
    });

    let controller = IngressController::new(
        config,
        source,
        upstreams,
        virtual_hosts,
        Arc::new(sink),
        metrics,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            // keep the sender alive so the controller keeps running
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, exiting...");
        let _ = shutdown_tx.send(true);
    });

    controller.run(events, shutdown_rx).await;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

fn crd_manifests() -> Result<String> {
    Ok(format!(
        "{}---\n{}",
        serde_yaml::to_string(&Upstream::crd())?,
        serde_yaml::to_string(&VirtualHost::crd())?
    ))
}
