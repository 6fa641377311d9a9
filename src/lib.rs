//! Admission control and server lifecycle for axum services.
//!
//! - [`security`]: sliding-window rate limiting in front of any router
//! - [`lifecycle`]: listener startup, graceful shutdown, readiness signaling

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::ServeConfig;
pub use error::{Error, Result};
pub use lifecycle::{LifecycleHandle, LifecycleManager, LifecycleState, Shutdown};
pub use security::{AdmissionGate, GrantResult, MemoryStore, Policy, WindowStore};
