//! # Quantix Proto
//!
//! Generated Rust code from protobuf definitions for the Node Daemon protocol.
//!
//! This crate contains the gRPC message types and client stubs used by the
//! control plane to drive per-node daemons. The daemon side of the protocol
//! lives in the node agent repository; heartbeats flow the other way over the
//! Connect JSON API and are not part of this service.

// Include generated code
pub mod generated {
    pub mod quantix {
        pub mod node {
            pub mod v1 {
                include!("generated/quantix.node.v1.rs");
            }
        }
    }
}

// =============================================================================
// Node Daemon Protocol Re-exports
// =============================================================================

/// Node daemon types and client stubs
pub mod node {
    pub use crate::generated::quantix::node::v1::*;
    pub use crate::generated::quantix::node::v1::node_daemon_service_client::NodeDaemonServiceClient;
}

// Re-export node types at crate root for convenience
pub use generated::quantix::node::v1::*;
pub use generated::quantix::node::v1::node_daemon_service_client::NodeDaemonServiceClient;
