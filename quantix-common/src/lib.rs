//! # Quantix Common
//!
//! Shared utilities for the Quantix-vDC control plane components.
//!
//! ## Logging
//!
//! One call installs the global subscriber; the exported macros keep the
//! per-subsystem `component` tags consistent across services:
//!
//! ```rust
//! use quantix_common::{init_logging, LogOptions};
//!
//! init_logging(&LogOptions::default()).unwrap();
//!
//! // Tagged instrumentation for control plane subsystems
//! quantix_common::log_placement!("vm-1", "node-7", "placed web-1 (2 vCPU)");
//! quantix_common::log_heartbeat!("node-7", "processed (1 pool report)");
//! ```

pub mod logging;

// Re-export logging entry points
pub use logging::{init_logging, LogFormat, LogOptions};
