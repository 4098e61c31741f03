//! Core translation and reconciliation for the ingress bridge
//!
//! This library provides:
//! - Translator deriving Upstreams and VirtualHosts from Ingresses
//! - Name-keyed diff engine converging stored resources toward the desired set
//! - Controller loop running full passes on ingress events and resync ticks

pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod reconciler;
pub mod sink;
pub mod source;
pub mod store;
pub mod translator;

#[cfg(test)]
mod fake;

pub use config::{ControllerConfig, SelectionPolicy};
pub use controller::{IngressController, PassSummary};
pub use error::{CoreError, Operation, Result};
pub use metrics::ControllerMetrics;
pub use reconciler::{Plan, Reconcilable, SyncSummary};
pub use sink::{ChannelSink, ErrorSink, LogSink};
pub use source::{EventKind, IngressEvent, IngressSource, SourceEvent};
pub use store::ResourceStore;
pub use translator::{Translation, Translator};
