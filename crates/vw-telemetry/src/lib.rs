//! Ambient observability stack: `tracing` subscriber init, a Prometheus
//! `MetricsRecorder`, and the HTTP server that exposes it alongside
//! liveness/readiness probes.

pub mod http;
pub mod init;
pub mod metrics;

pub use http::run_server;
pub use init::init_tracing;
pub use metrics::{install, PrometheusRecorder};
