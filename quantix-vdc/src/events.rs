//! System event log.
//!
//! Every meaningful transition emits a structured event with a fixed
//! `event_type` tag. Events are mirrored to tracing at the matching level
//! and appended to the event repository; append failures are logged but
//! never fail the operation that emitted the event.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{EventCategory, EventLevel, PoolHealth, Result, SystemEvent};
use crate::repo::{EventFilter, EventRepository};

// Fixed event type tags matched by dashboards and alerting.
pub const HOST_DISCONNECTED: &str = "HOST_DISCONNECTED";
pub const HOST_RECONNECTED: &str = "HOST_RECONNECTED";
pub const NODE_REGISTERED: &str = "NODE_REGISTERED";
pub const NODE_DECOMMISSIONED: &str = "NODE_DECOMMISSIONED";
pub const VM_RELOCATED: &str = "VM_RELOCATED";
pub const VM_LOST: &str = "VM_LOST";
pub const VM_FOUND: &str = "VM_FOUND";
pub const VM_DISCOVERED: &str = "VM_DISCOVERED";
pub const POOL_DEGRADED: &str = "POOL_DEGRADED";
pub const POOL_RECOVERED: &str = "POOL_RECOVERED";

/// Append-only event log shared by all services.
pub struct EventLog {
    repo: Arc<dyn EventRepository>,
}

impl EventLog {
    pub fn new(repo: Arc<dyn EventRepository>) -> Self {
        Self { repo }
    }

    /// Record an event. Never fails the caller.
    pub async fn emit(&self, event: SystemEvent) {
        match event.level {
            EventLevel::Debug => debug!(
                event_type = %event.event_type,
                category = %event.category,
                "📣 {}", event.message
            ),
            EventLevel::Info => info!(
                event_type = %event.event_type,
                category = %event.category,
                "📣 {}", event.message
            ),
            EventLevel::Warning => warn!(
                event_type = %event.event_type,
                category = %event.category,
                "📣 {}", event.message
            ),
            EventLevel::Error => error!(
                event_type = %event.event_type,
                category = %event.category,
                "📣 {}", event.message
            ),
        }
        if let Err(e) = self.repo.append(&event).await {
            warn!(error = %e, event_type = %event.event_type, "Failed to persist event");
        }
    }

    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<SystemEvent>> {
        self.repo.list(filter).await
    }

    pub async fn host_disconnected(&self, node_id: Uuid, hostname: &str, vm_ids: &[Uuid]) {
        self.emit(
            SystemEvent::new(
                EventLevel::Warning,
                EventCategory::Node,
                HOST_DISCONNECTED,
                format!(
                    "Node {} stopped heartbeating; {} VM(s) affected",
                    hostname,
                    vm_ids.len()
                ),
            )
            .with_resource(node_id)
            .with_details(json!({ "affectedVmIds": vm_ids })),
        )
        .await;
    }

    pub async fn host_reconnected(&self, node_id: Uuid, hostname: &str) {
        self.emit(
            SystemEvent::new(
                EventLevel::Info,
                EventCategory::Node,
                HOST_RECONNECTED,
                format!("Node {} is heartbeating again", hostname),
            )
            .with_resource(node_id),
        )
        .await;
    }

    pub async fn node_registered(&self, node_id: Uuid, hostname: &str, rejoined: bool) {
        let verb = if rejoined { "re-registered" } else { "registered" };
        self.emit(
            SystemEvent::new(
                EventLevel::Info,
                EventCategory::Node,
                NODE_REGISTERED,
                format!("Node {} {}", hostname, verb),
            )
            .with_resource(node_id),
        )
        .await;
    }

    pub async fn node_decommissioned(&self, node_id: Uuid, hostname: &str) {
        self.emit(
            SystemEvent::new(
                EventLevel::Info,
                EventCategory::Node,
                NODE_DECOMMISSIONED,
                format!("Node {} decommissioned", hostname),
            )
            .with_resource(node_id),
        )
        .await;
    }

    pub async fn vm_relocated(&self, vm_id: Uuid, name: &str, from: Option<Uuid>, to: Uuid) {
        self.emit(
            SystemEvent::new(
                EventLevel::Warning,
                EventCategory::Vm,
                VM_RELOCATED,
                format!("VM {} reported by a different node than assigned", name),
            )
            .with_resource(vm_id)
            .with_details(json!({ "previousNodeId": from, "nodeId": to })),
        )
        .await;
    }

    pub async fn vm_lost(&self, vm_id: Uuid, name: &str) {
        self.emit(
            SystemEvent::new(
                EventLevel::Warning,
                EventCategory::Vm,
                VM_LOST,
                format!("VM {} not reported by its host", name),
            )
            .with_resource(vm_id),
        )
        .await;
    }

    pub async fn vm_found(&self, vm_id: Uuid, name: &str) {
        self.emit(
            SystemEvent::new(
                EventLevel::Info,
                EventCategory::Vm,
                VM_FOUND,
                format!("VM {} reported by its host again", name),
            )
            .with_resource(vm_id),
        )
        .await;
    }

    pub async fn vm_discovered(&self, vm_id: Uuid, name: &str, node_id: Uuid) {
        self.emit(
            SystemEvent::new(
                EventLevel::Info,
                EventCategory::Vm,
                VM_DISCOVERED,
                format!("VM {} discovered on a host, adopted as unmanaged", name),
            )
            .with_resource(vm_id)
            .with_details(json!({ "nodeId": node_id })),
        )
        .await;
    }

    pub async fn pool_phase_changed(
        &self,
        pool_id: Uuid,
        name: &str,
        from: PoolHealth,
        to: PoolHealth,
    ) {
        let (event_type, level) = match to {
            PoolHealth::Healthy => (POOL_RECOVERED, EventLevel::Info),
            _ => (POOL_DEGRADED, EventLevel::Warning),
        };
        self.emit(
            SystemEvent::new(
                level,
                EventCategory::Storage,
                event_type,
                format!("Storage pool {} went {} -> {}", name, from, to),
            )
            .with_resource(pool_id),
        )
        .await;
    }
}
