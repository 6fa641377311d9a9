//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (admission counters, lifecycle gauge)
//!
//! Consumers:
//!     → stdout/stderr (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (client, policy, address, state)
//! - Environment filter overrides configured level
//! - Metrics are cheap and no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
