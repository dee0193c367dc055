//! Metrics collection for simulation analysis.

use hashbrown::HashMap;
use swarmring::{NodeId, Role};

use crate::time::Timestamp;

/// One node's ring and election state at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeState {
    pub role: Role,
    pub left_id: NodeId,
    pub right_id: NodeId,
    pub leader_id: NodeId,
    pub is_leader: bool,
    pub has_decided: bool,
    pub resets: u32,
}

/// The state of every node at a point in time.
#[derive(Debug, Clone)]
pub struct RingSnapshot {
    pub time: Timestamp,
    pub nodes: HashMap<NodeId, NodeState>,
}

impl RingSnapshot {
    pub fn new(time: Timestamp) -> Self {
        Self {
            time,
            nodes: HashMap::new(),
        }
    }

    pub fn record_node(&mut self, id: NodeId, state: NodeState) {
        self.nodes.insert(id, state);
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.get(&id)
    }

    /// Largest id present.
    pub fn max_id(&self) -> Option<NodeId> {
        self.nodes.keys().copied().max()
    }

    /// Nodes that consider themselves leader, ascending.
    pub fn leaders(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, s)| s.is_leader)
            .map(|(&id, _)| id)
            .collect();
        out.sort_unstable();
        out
    }

    pub fn all_decided(&self) -> bool {
        self.nodes.values().all(|s| s.has_decided)
    }

    pub fn all_cooperative(&self) -> bool {
        self.nodes.values().all(|s| s.role == Role::Cooperative)
    }

    /// The leader every node names, if they all name the same one.
    pub fn agreed_leader(&self) -> Option<NodeId> {
        let mut ids = self.nodes.values().map(|s| s.leader_id);
        let first = ids.next()?;
        ids.all(|id| id == first).then_some(first)
    }

    /// Right pointers form one cycle through every node, and each left
    /// pointer mirrors the right pointer that reaches it.
    pub fn is_ring_cycle(&self) -> bool {
        if self.nodes.len() < 2 {
            return false;
        }
        let Some(start) = self.nodes.keys().copied().min() else {
            return false;
        };

        let mirrored = self.nodes.iter().all(|(&id, s)| {
            self.nodes
                .get(&s.right_id)
                .is_some_and(|next| s.right_id != id && next.left_id == id)
        });
        if !mirrored {
            return false;
        }

        // Mirrored pointers give every node one predecessor, so getting back
        // to the start after exactly n hops means the cycle covers everyone.
        let mut hops = 0;
        let mut current = start;
        loop {
            current = match self.nodes.get(&current) {
                Some(s) => s.right_id,
                None => return false,
            };
            hops += 1;
            if current == start || hops > self.nodes.len() {
                break;
            }
        }
        hops == self.nodes.len()
    }

    /// Exactly one leader, it holds the largest id, and every node has
    /// decided on it.
    pub fn converged(&self) -> bool {
        let leaders = self.leaders();
        leaders.len() == 1
            && Some(leaders[0]) == self.max_id()
            && self.all_decided()
            && self.agreed_leader() == Some(leaders[0])
    }
}

/// Simulation metrics collected over time.
#[derive(Debug, Clone, Default)]
pub struct SimMetrics {
    /// Non-null frames put on the air.
    pub frames_sent: u64,
    /// Per-receiver copies that reached a node.
    pub frames_delivered: u64,
    /// Per-receiver copies lost on a link.
    pub frames_lost: u64,
    /// Per-receiver copies damaged in transit (also counted as delivered).
    pub frames_corrupted: u64,
    /// Ticks executed across all nodes.
    pub ticks: u64,
    /// Snapshots taken during simulation.
    pub snapshots: Vec<RingSnapshot>,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_snapshot(&mut self, snapshot: RingSnapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn latest_snapshot(&self) -> Option<&RingSnapshot> {
        self.snapshots.last()
    }

    /// Time of the first converged snapshot.
    pub fn convergence_time(&self) -> Option<Timestamp> {
        self.snapshots.iter().find(|s| s.converged()).map(|s| s.time)
    }
}

/// Outcome of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub end_time: Timestamp,
    pub metrics: SimMetrics,
    /// No events were left when the run stopped.
    pub queue_exhausted: bool,
}

impl SimulationResult {
    pub fn converged(&self) -> bool {
        self.metrics
            .latest_snapshot()
            .is_some_and(RingSnapshot::converged)
    }

    pub fn final_leaders(&self) -> Vec<NodeId> {
        self.metrics
            .latest_snapshot()
            .map(RingSnapshot::leaders)
            .unwrap_or_default()
    }

    pub fn agreed_leader(&self) -> Option<NodeId> {
        self.metrics
            .latest_snapshot()
            .and_then(RingSnapshot::agreed_leader)
    }
}
