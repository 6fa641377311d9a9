//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → real_ip.rs (derive the client key)
//!     → rate_limit.rs (pick the policy, ask the store, set headers)
//!     → window.rs (sliding-window decision)
//!     → 429, or pass to the downstream handler
//! ```
//!
//! # Design Decisions
//! - The store is injected, never global
//! - Key and policy selection are plain closures
//! - Rejection is an outcome, not an error

pub mod rate_limit;
pub mod real_ip;
pub mod window;

pub use rate_limit::{admission_middleware, fixed_policy, AdmissionGate, RoutePolicies};
pub use window::{GrantResult, MemoryStore, Policy, WindowStore};
