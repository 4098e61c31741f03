//! Command line and environment configuration

use bridge_core::config::DEFAULT_INGRESS_CLASS;
use bridge_core::{ControllerConfig, SelectionPolicy};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Keeps gateway Upstreams and VirtualHosts in sync with cluster Ingresses
#[derive(Parser, Debug)]
#[command(name = "bridge-controller", version, about)]
pub struct Args {
    /// Seconds between full resync passes
    #[arg(
        long,
        env = "BRIDGE_RESYNC_INTERVAL",
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub resync_interval: u64,

    /// Translate every ingress, not only those of our class
    #[arg(long, env = "BRIDGE_GLOBAL_INGRESS")]
    pub global_ingress: bool,

    /// Namespace generated Upstreams and VirtualHosts are written to
    #[arg(long, env = "BRIDGE_TARGET_NAMESPACE", default_value = "ingress-bridge-system")]
    pub target_namespace: String,

    /// Ingress class value claimed by this controller
    #[arg(long, env = "BRIDGE_INGRESS_CLASS", default_value = DEFAULT_INGRESS_CLASS)]
    pub ingress_class: String,

    /// Label selector restricting watched ingresses
    #[arg(long, env = "BRIDGE_INGRESS_SELECTOR")]
    pub ingress_selector: Option<String>,

    /// Unread errors held before new ones are dropped
    #[arg(long, env = "BRIDGE_ERROR_BUFFER", default_value_t = 64)]
    pub error_buffer: usize,

    /// Address serving /metrics and /healthz
    #[arg(long, env = "BRIDGE_METRICS_ADDR", default_value = "0.0.0.0:9090")]
    pub metrics_addr: SocketAddr,

    #[arg(long, env = "BRIDGE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Print the Upstream and VirtualHost CRDs as YAML and exit
    #[arg(long)]
    pub print_crds: bool,
}

impl Args {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            resync_interval: Duration::from_secs(self.resync_interval),
            target_namespace: self.target_namespace.clone(),
            selection: SelectionPolicy::new(self.global_ingress, self.ingress_class.clone()),
        }
    }
}
