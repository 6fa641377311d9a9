//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (manager.rs):
//!     Load TLS → Bind listeners → Spawn serving tasks → Listening
//!
//! Shutdown (shutdown.rs, manager.rs):
//!     Trigger (signal or stop()) → ShuttingDown → Stop accepting
//!     → Drain in-flight requests → Close socket → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT/SIGHUP → Shutdown::trigger
//! ```
//!
//! # Lifecycle States
//!
//! ```text
//! Created → Listening → ShuttingDown → Stopped
//! ```
//!
//! # Design Decisions
//! - States only move forward; each transition is published once
//! - First shutdown trigger wins, later ones are no-ops
//! - Drain has a deadline: remaining connections are dropped after it
//! - The redirect listener is not drained

pub mod manager;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use manager::{LifecycleHandle, LifecycleManager};
pub use shutdown::Shutdown;
pub use state::LifecycleState;
