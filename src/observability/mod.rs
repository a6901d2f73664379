//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Render middleware, relay and server produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows into every render log event
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
