//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig
//!     → listener.rs (address normalization, primary + redirect bind)
//!     → tls.rs (optional rustls configuration for the primary)
//!     → handed to the lifecycle manager for serving
//! ```
//!
//! # Design Decisions
//! - Primary bind errors abort startup; redirect bind errors only warn
//! - Sockets are bound before anything is reported ready

pub mod listener;
pub mod tls;

pub use listener::{BindAddress, ListenerSet};
