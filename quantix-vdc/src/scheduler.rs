//! VM placement scheduler.
//!
//! Pure and stateless: filter the candidate nodes, score the survivors,
//! break ties on node ID so identical inputs always pick the same node.
//! Reservation of the chosen node's resources is the calling service's job.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Node, NodePhase, Resources, Toleration, VmSpec};

/// Optional placement constraints carried on a create request.
#[derive(Debug, Clone, Default)]
pub struct PlacementHints {
    /// Pin to a specific node, bypassing scheduling entirely.
    pub node_id: Option<Uuid>,
    /// Labels the node must carry.
    pub node_selector: HashMap<String, String>,
    /// Taints the VM tolerates.
    pub tolerations: Vec<Toleration>,
}

/// The scheduling decision: where to place and what to reserve there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub node_id: Uuid,
    pub requested: Resources,
}

/// Why no node qualified, per filter stage.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoCandidate {
    pub total_nodes: usize,
    pub rejected_phase: usize,
    pub rejected_unschedulable: usize,
    pub rejected_taints: usize,
    pub rejected_labels: usize,
    pub rejected_resources: usize,
}

impl std::fmt::Display for NoCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no candidate among {} nodes (phase: {}, unschedulable: {}, taints: {}, labels: {}, resources: {})",
            self.total_nodes,
            self.rejected_phase,
            self.rejected_unschedulable,
            self.rejected_taints,
            self.rejected_labels,
            self.rejected_resources,
        )
    }
}

/// Select a node for the VM spec, or explain why none fits.
pub fn schedule(
    nodes: &[Node],
    spec: &VmSpec,
    hints: &PlacementHints,
) -> Result<Placement, NoCandidate> {
    let requested = spec.requested_resources();
    let mut reason = NoCandidate { total_nodes: nodes.len(), ..NoCandidate::default() };

    let mut candidates: Vec<&Node> = Vec::new();
    for node in nodes {
        if let Some(pinned) = hints.node_id {
            if node.id != pinned {
                continue;
            }
        }
        if node.status.phase != NodePhase::Ready {
            reason.rejected_phase += 1;
            continue;
        }
        if !node.scheduling.schedulable {
            reason.rejected_unschedulable += 1;
            continue;
        }
        let tolerated = node
            .scheduling
            .taints
            .iter()
            .all(|taint| hints.tolerations.iter().any(|t| t.tolerates(taint)));
        if !tolerated {
            reason.rejected_taints += 1;
            continue;
        }
        let labels_match = hints
            .node_selector
            .iter()
            .all(|(k, v)| node.labels.get(k) == Some(v));
        if !labels_match {
            reason.rejected_labels += 1;
            continue;
        }
        if !free_resources(node).fits(&requested) {
            reason.rejected_resources += 1;
            continue;
        }
        candidates.push(node);
    }

    // Most free CPU, then most free memory, then lexicographic node ID so the
    // result is stable across runs.
    candidates.sort_by(|a, b| {
        let fa = free_resources(a);
        let fb = free_resources(b);
        fb.cpu
            .cmp(&fa.cpu)
            .then(fb.memory.cmp(&fa.memory))
            .then(a.id.cmp(&b.id))
    });

    match candidates.first() {
        Some(node) => Ok(Placement { node_id: node.id, requested }),
        None => Err(reason),
    }
}

#[derive(Debug, Clone, Copy)]
struct Free {
    cpu: i64,
    memory: i64,
}

impl Free {
    fn fits(&self, requested: &Resources) -> bool {
        self.cpu >= i64::from(requested.cpu_cores) && self.memory >= requested.memory_mib as i64
    }
}

fn free_resources(node: &Node) -> Free {
    let limit = node.overcommitted_allocatable();
    Free {
        cpu: i64::from(limit.cpu_cores) - i64::from(node.status.allocated.cpu_cores),
        memory: limit.memory_mib as i64 - node.status.allocated.memory_mib as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CpuSpec, OvercommitRatios, Taint};

    fn ready_node(hostname: &str, cpu: u32, memory_mib: u64) -> Node {
        let mut node = Node::new(hostname.to_string(), "10.0.0.1".to_string());
        node.status.phase = NodePhase::Ready;
        node.status.allocatable = Resources::new(cpu, memory_mib);
        node.scheduling.overcommit = OvercommitRatios { cpu: 1.0, memory: 1.0 };
        node
    }

    fn vm_spec(cores: u32, memory_mib: u64) -> VmSpec {
        VmSpec {
            cpu: CpuSpec { sockets: 1, cores, threads_per_core: 1 },
            memory_mib,
            ..VmSpec::default()
        }
    }

    #[test]
    fn test_picks_node_with_most_free_cpu() {
        let mut h1 = ready_node("h1", 16, 16384);
        h1.status.allocated = Resources::new(0, 0);
        let mut h2 = ready_node("h2", 16, 16384);
        h2.status.allocated = Resources::new(14, 12288);

        let placement = schedule(
            &[h1.clone(), h2],
            &vm_spec(2, 2048),
            &PlacementHints::default(),
        )
        .unwrap();
        assert_eq!(placement.node_id, h1.id);
        assert_eq!(placement.requested, Resources::new(2, 2048));
    }

    #[test]
    fn test_deterministic_tiebreak_on_node_id() {
        let h1 = ready_node("h1", 16, 16384);
        let h2 = ready_node("h2", 16, 16384);
        let expected = h1.id.min(h2.id);

        for _ in 0..10 {
            let placement = schedule(
                &[h1.clone(), h2.clone()],
                &vm_spec(1, 512),
                &PlacementHints::default(),
            )
            .unwrap();
            assert_eq!(placement.node_id, expected);
        }
        // Order of the input slice does not matter either.
        let placement = schedule(
            &[h2.clone(), h1.clone()],
            &vm_spec(1, 512),
            &PlacementHints::default(),
        )
        .unwrap();
        assert_eq!(placement.node_id, expected);
    }

    #[test]
    fn test_filters_not_ready_and_unschedulable() {
        let mut parked = ready_node("h1", 16, 16384);
        parked.status.phase = NodePhase::Maintenance;
        let mut cordoned = ready_node("h2", 16, 16384);
        cordoned.scheduling.schedulable = false;

        let reason = schedule(
            &[parked, cordoned],
            &vm_spec(1, 512),
            &PlacementHints::default(),
        )
        .unwrap_err();
        assert_eq!(reason.rejected_phase, 1);
        assert_eq!(reason.rejected_unschedulable, 1);
        assert_eq!(reason.total_nodes, 2);
    }

    #[test]
    fn test_taints_require_toleration() {
        let mut tainted = ready_node("h1", 16, 16384);
        tainted.scheduling.taints.push(Taint {
            key: "gpu".to_string(),
            value: "a100".to_string(),
        });

        let spec = vm_spec(1, 512);
        let reason = schedule(&[tainted.clone()], &spec, &PlacementHints::default()).unwrap_err();
        assert_eq!(reason.rejected_taints, 1);

        let hints = PlacementHints {
            tolerations: vec![Toleration { key: "gpu".to_string(), value: String::new() }],
            ..PlacementHints::default()
        };
        assert!(schedule(&[tainted], &spec, &hints).is_ok());
    }

    #[test]
    fn test_label_selector() {
        let mut ssd = ready_node("h1", 16, 16384);
        ssd.labels.insert("disk".to_string(), "ssd".to_string());
        let hdd = ready_node("h2", 16, 16384);

        let hints = PlacementHints {
            node_selector: [("disk".to_string(), "ssd".to_string())].into(),
            ..PlacementHints::default()
        };
        let placement = schedule(&[hdd, ssd.clone()], &vm_spec(1, 512), &hints).unwrap();
        assert_eq!(placement.node_id, ssd.id);
    }

    #[test]
    fn test_overcommit_expands_capacity() {
        let mut node = ready_node("h1", 4, 4096);
        node.status.allocated = Resources::new(4, 0);

        // 1.0 ratio: full on CPU.
        let reason =
            schedule(&[node.clone()], &vm_spec(2, 512), &PlacementHints::default()).unwrap_err();
        assert_eq!(reason.rejected_resources, 1);

        // 2.0 ratio: 8 schedulable cores, 4 free.
        node.scheduling.overcommit = OvercommitRatios { cpu: 2.0, memory: 1.0 };
        assert!(schedule(&[node], &vm_spec(2, 512), &PlacementHints::default()).is_ok());
    }

    #[test]
    fn test_explicit_node_pin() {
        let h1 = ready_node("h1", 16, 16384);
        let h2 = ready_node("h2", 2, 1024);

        let hints = PlacementHints { node_id: Some(h2.id), ..PlacementHints::default() };
        let placement = schedule(&[h1, h2.clone()], &vm_spec(1, 512), &hints).unwrap();
        assert_eq!(placement.node_id, h2.id);
    }

    #[test]
    fn test_scheduler_does_not_mutate() {
        let node = ready_node("h1", 16, 16384);
        let before = node.status.allocated;
        let _ = schedule(&[node.clone()], &vm_spec(2, 2048), &PlacementHints::default());
        assert_eq!(node.status.allocated, before);
    }
}
