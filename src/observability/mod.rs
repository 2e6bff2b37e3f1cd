//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config resolution, dispatch, component init, config reload
//!     → logging.rs (structured `tracing` events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or `observability.log_level`)
//!     → Prometheus scrape endpoint (when `observability.metrics_enabled`)
//! ```
//!
//! # Design Decisions
//! - Recording a metric without an installed exporter is a no-op
//! - Request id flows through the HTTP layer's trace span

pub mod logging;
pub mod metrics;
