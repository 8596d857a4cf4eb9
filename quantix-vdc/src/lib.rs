//! # Quantix-vDC Control Plane
//!
//! Centralized control plane for a KVM virtualization cluster: it manages a
//! fleet of hypervisor nodes, their virtual machines, storage pools and
//! virtual networks. Operators talk to the Connect JSON API; per-node
//! daemons execute commands over gRPC and push heartbeats back.
//!
//! The crate is split along the control flow:
//! API request -> service -> repository for durable intent -> scheduler
//! where placement is needed -> daemon pool to push commands to nodes.
//! Independently, heartbeats update node liveness and feed storage/VM
//! reconciliation, and background tasks sweep stale nodes and lost VMs.

pub mod api;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod events;
pub mod repo;
pub mod scheduler;
pub mod services;
pub mod tasks;
