//! Event types and priority queue ordering for discrete event simulation.

use std::cmp::Ordering;

use swarmring::NodeId;

use crate::time::Timestamp;

/// Unique sequence number for deterministic event ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Scenario actions that can be scheduled during simulation.
#[derive(Debug, Clone)]
pub enum ScenarioAction {
    /// Partition the network into isolated groups.
    Partition { groups: Vec<Vec<NodeId>> },
    /// Heal all partitions (restore every link).
    HealPartition,
    /// Disable a specific link.
    DisableLink { from: NodeId, to: NodeId },
    /// Enable a specific link.
    EnableLink { from: NodeId, to: NodeId },
    /// Set loss rate on a link.
    SetLossRate { from: NodeId, to: NodeId, rate: f64 },
    /// Set loss rate on every link.
    SetGlobalLossRate { rate: f64 },
    /// Record a ring snapshot.
    TakeSnapshot,
}

/// Events in the discrete event simulation.
#[derive(Debug, Clone)]
pub enum Event {
    /// Hand a frame to a node's radio.
    FrameDelivery {
        to: NodeId,
        from: NodeId,
        data: Vec<u8>,
        distance: u16,
    },
    /// Run one control-loop tick and one transmit slot for a node.
    Tick { node: NodeId },
    /// Execute a scenario action.
    ScenarioAction(ScenarioAction),
}

/// A scheduled event with timestamp and sequence number for ordering.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub time: Timestamp,
    /// Breaks ties between events at the same time, in scheduling order.
    pub seq: SequenceNumber,
    pub event: Event,
}

impl ScheduledEvent {
    pub fn new(time: Timestamp, seq: SequenceNumber, event: Event) -> Self {
        Self { time, seq, event }
    }
}

// BinaryHeap is a max-heap; order is reversed so the earliest event pops first.
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.time.cmp(&self.time) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use super::*;

    fn tick_at(ms: u64, seq: u64, node: NodeId) -> ScheduledEvent {
        ScheduledEvent::new(
            Timestamp::from_millis(ms),
            SequenceNumber::new(seq),
            Event::Tick { node },
        )
    }

    #[test]
    fn test_earlier_time_first() {
        let late = tick_at(60, 1, 1);
        let early = tick_at(30, 2, 2);
        assert!(early > late);
    }

    #[test]
    fn test_same_time_in_sequence_order() {
        let mut heap = BinaryHeap::new();
        heap.push(tick_at(30, 3, 3));
        heap.push(tick_at(30, 1, 1));
        heap.push(tick_at(31, 0, 9));
        heap.push(tick_at(30, 2, 2));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop())
            .map(|e| e.seq.value())
            .collect();
        assert_eq!(order, [1, 2, 3, 0]);
    }
}
