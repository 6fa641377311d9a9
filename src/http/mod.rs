//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! caller's Router (possibly behind an AdmissionGate)
//!     → server.rs (trace + timeout layers)
//!     → served on the primary listener by the lifecycle manager
//!
//! plaintext request on the redirect listener
//!     → redirect.rs (301 to the HTTPS origin)
//! ```

pub mod redirect;
pub mod server;

pub use server::wrap;
