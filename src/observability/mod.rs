//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and clients produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Prometheus scrape endpoint
//! ```
//!
//! Request IDs are attached by the HTTP layer and show up in every span.

pub mod logging;
pub mod metrics;
