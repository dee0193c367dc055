//! Discrete event simulator for swarmring nodes.

use std::collections::BinaryHeap;

use hashbrown::HashMap;
use log::{debug, trace};
use swarmring::types::FRAME_LEN;
use swarmring::{NodeId, Random};

use crate::event::{Event, ScenarioAction, ScheduledEvent, SequenceNumber};
use crate::metrics::{NodeState, RingSnapshot, SimMetrics, SimulationResult};
use crate::node::{SimNode, SimRandom};
use crate::time::{Duration, Timestamp};
use crate::topology::Topology;

/// Time between two ticks of the same node.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(30);

/// Discrete event simulator for swarmring networks.
///
/// Every node ticks once per tick period. A tick runs the node's control
/// loop and gives it one transmit slot; the frame it puts on the air reaches
/// every active neighbor after the link delay, unless the link loses it.
pub struct Simulator {
    nodes: HashMap<NodeId, SimNode>,
    /// Insertion order, for deterministic iteration.
    order: Vec<NodeId>,
    topology: Topology,
    current_time: Timestamp,
    tick_period: Duration,
    event_queue: BinaryHeap<ScheduledEvent>,
    metrics: SimMetrics,
    next_seq: u64,
    /// Drives loss and corruption.
    rng: SimRandom,
    snapshot_interval: Option<Duration>,
    next_snapshot: Option<Timestamp>,
}

impl Simulator {
    /// Create a new simulator with given RNG seed.
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            topology: Topology::new(),
            current_time: Timestamp::ZERO,
            tick_period: DEFAULT_TICK_PERIOD,
            event_queue: BinaryHeap::new(),
            metrics: SimMetrics::new(),
            next_seq: 0,
            rng: SimRandom::new(seed),
            snapshot_interval: None,
            next_snapshot: None,
        }
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the tick period. Affects nodes added afterwards.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Record a ring snapshot at a fixed interval.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self.next_snapshot = Some(self.current_time + interval);
        self
    }

    /// Add a node and schedule its first tick one period from now.
    ///
    /// Returns `None` when a node with the same id is already present.
    pub fn add_node(&mut self, node: SimNode) -> Option<NodeId> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return None;
        }
        self.nodes.insert(id, node);
        self.order.push(id);
        self.schedule(self.current_time + self.tick_period, Event::Tick { node: id });
        Some(id)
    }

    /// Add a node whose id is drawn at random, redrawing on collision.
    ///
    /// Returns `None` when every id is taken.
    pub fn add_random_node(&mut self, random: &mut impl Random) -> Option<NodeId> {
        if self.nodes.len() >= usize::from(NodeId::MAX) {
            return None;
        }
        loop {
            let node = SimNode::random(random);
            if !self.nodes.contains_key(&node.id()) {
                return self.add_node(node);
            }
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&SimNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SimNode> {
        self.nodes.get_mut(&id)
    }

    /// Node ids in the order the nodes were added.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Schedule an event.
    pub fn schedule(&mut self, time: Timestamp, event: Event) {
        let seq = SequenceNumber::new(self.next_seq);
        self.next_seq += 1;
        self.event_queue.push(ScheduledEvent::new(time, seq, event));
    }

    pub fn schedule_action(&mut self, time: Timestamp, action: ScenarioAction) {
        self.schedule(time, Event::ScenarioAction(action));
    }

    /// Run simulation until the given time, then take a final snapshot.
    pub fn run_until(&mut self, end_time: Timestamp) -> SimulationResult {
        while self.event_queue.peek().is_some_and(|e| e.time <= end_time) {
            let Some(event) = self.event_queue.pop() else {
                break;
            };
            self.advance_time(event.time);
            self.process_event(event.event);
            self.maybe_take_snapshot();
        }

        self.advance_time(end_time);
        self.take_snapshot();
        self.result()
    }

    pub fn run_for(&mut self, duration: Duration) -> SimulationResult {
        self.run_until(self.current_time + duration)
    }

    /// Run for a number of tick periods.
    pub fn run_ticks(&mut self, ticks: u64) -> SimulationResult {
        self.run_for(self.tick_period * ticks)
    }

    /// Process at most `max_events` events.
    pub fn run_events(&mut self, max_events: usize) -> SimulationResult {
        for _ in 0..max_events {
            let Some(event) = self.event_queue.pop() else {
                break;
            };
            self.advance_time(event.time);
            self.process_event(event.event);
            self.maybe_take_snapshot();
        }

        self.take_snapshot();
        self.result()
    }

    fn result(&self) -> SimulationResult {
        SimulationResult {
            end_time: self.current_time,
            metrics: self.metrics.clone(),
            queue_exhausted: self.event_queue.is_empty(),
        }
    }

    fn advance_time(&mut self, time: Timestamp) {
        if time > self.current_time {
            self.current_time = time;
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::FrameDelivery {
                to,
                from,
                data,
                distance,
            } => self.deliver_frame(to, from, &data, distance),
            Event::Tick { node } => self.fire_tick(node),
            Event::ScenarioAction(action) => self.execute_action(action),
        }
    }

    fn deliver_frame(&mut self, to: NodeId, from: NodeId, data: &[u8], distance: u16) {
        if let Some(node) = self.nodes.get_mut(&to) {
            trace!("deliver {} -> {} at distance {}", from, to, distance);
            node.receive(data, distance);
            self.metrics.frames_delivered += 1;
        }
    }

    fn fire_tick(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let sent = node.tick();
        self.metrics.ticks += 1;

        if let Some(frame) = sent {
            self.broadcast(id, frame);
        }
        self.schedule(self.current_time + self.tick_period, Event::Tick { node: id });
    }

    /// Put a frame on the air: every active neighbor gets its own copy,
    /// subject to that link's loss and corruption.
    fn broadcast(&mut self, sender: NodeId, frame: [u8; FRAME_LEN]) {
        self.metrics.frames_sent += 1;

        for neighbor in self.topology.neighbors(sender) {
            let Some(link) = self.topology.get_link(sender, neighbor) else {
                continue;
            };
            let (loss_rate, corruption_rate) = (link.loss_rate, link.corruption_rate);
            let (delay, distance) = (link.delay, link.distance);

            if loss_rate > 0.0 && self.rng.gen_f64() < loss_rate {
                trace!("lost {} -> {}", sender, neighbor);
                self.metrics.frames_lost += 1;
                continue;
            }

            let mut data = frame.to_vec();
            if corruption_rate > 0.0 && self.rng.gen_f64() < corruption_rate {
                let at = self.rng.gen_range(0, FRAME_LEN as u64) as usize;
                let mask = self.rng.gen_range(1, 256) as u8;
                data[at] ^= mask;
                trace!("corrupted {} -> {} at byte {}", sender, neighbor, at);
                self.metrics.frames_corrupted += 1;
            }

            self.schedule(
                self.current_time + delay,
                Event::FrameDelivery {
                    to: neighbor,
                    from: sender,
                    data,
                    distance,
                },
            );
        }
    }

    fn execute_action(&mut self, action: ScenarioAction) {
        match action {
            ScenarioAction::Partition { groups } => {
                debug!("t={}ms: partition {:?}", self.current_time.as_millis(), groups);
                self.topology.partition(&groups);
            }
            ScenarioAction::HealPartition => {
                debug!("t={}ms: heal", self.current_time.as_millis());
                self.topology.heal();
            }
            ScenarioAction::DisableLink { from, to } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.active = false;
                }
            }
            ScenarioAction::EnableLink { from, to } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.active = true;
                }
            }
            ScenarioAction::SetLossRate { from, to, rate } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.loss_rate = rate.clamp(0.0, 1.0);
                }
            }
            ScenarioAction::SetGlobalLossRate { rate } => {
                self.topology.set_global_loss_rate(rate);
            }
            ScenarioAction::TakeSnapshot => self.take_snapshot(),
        }
    }

    fn maybe_take_snapshot(&mut self) {
        if let Some(next) = self.next_snapshot {
            if self.current_time >= next {
                self.take_snapshot();
                if let Some(interval) = self.snapshot_interval {
                    self.next_snapshot = Some(next + interval);
                }
            }
        }
    }

    /// Record every node's ring and election state.
    pub fn take_snapshot(&mut self) {
        let mut snapshot = RingSnapshot::new(self.current_time);
        for (&id, node) in &self.nodes {
            let n = node.inner();
            snapshot.record_node(
                id,
                NodeState {
                    role: n.role(),
                    left_id: n.left_id(),
                    right_id: n.right_id(),
                    leader_id: n.leader_id(),
                    is_leader: n.is_leader(),
                    has_decided: n.has_decided(),
                    resets: n.metrics().resets,
                },
            );
        }
        self.metrics.add_snapshot(snapshot);
    }
}
