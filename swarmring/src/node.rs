//! Node implementation - the per-robot protocol state machine.
//!
//! The node is sans-IO. A scheduler owns the loop and drives it through
//! [`RadioHandler`]: frames heard by the radio go to `on_receive`, once per
//! period the scheduler calls `tick`, then offers `next_to_transmit` to the
//! medium and reports the hand-off with `on_transmitted`.
//!
//! # Usage
//!
//! ```ignore
//! let mut node = Node::<_, _>::new(crc, leds_and_motors, &mut rng);
//!
//! loop {
//!     while let Some((frame, distance)) = radio.poll() {
//!         node.on_receive(&frame, distance);
//!     }
//!     node.tick();
//!     radio.send(&node.next_to_transmit().to_bytes());
//!     node.on_transmitted();
//! }
//! ```

use core::marker::PhantomData;

use embassy_sync::channel::Channel;
use log::trace;

use crate::config::{DefaultConfig, RingConfig};
use crate::neighbors::NeighborTable;
use crate::queue::OutboundQueue;
use crate::traits::{Actuator, EventChannel, Integrity, RadioHandler, Random};
use crate::types::{Event, MessageKind, Motion, NodeId, NodeMetrics, Rgb, Role, NO_ID};
use crate::wire::Frame;

/// The main protocol node.
///
/// Generic over:
/// - `I`: Integrity code implementation
/// - `A`: Actuator (indicator and motors)
/// - `Cfg`: Compile-time bounds and thresholds
pub struct Node<I, A, Cfg = DefaultConfig> {
    // Dependencies (injected)
    integrity: I,
    actuator: A,

    events: EventChannel,

    // Identity
    id: NodeId,
    color_id: NodeId,
    designated_initiator: bool,

    // Ring position
    pub(crate) left_id: NodeId,
    pub(crate) right_id: NodeId,
    pub(crate) role: Role,

    // Election
    pub(crate) leader_id: NodeId,
    pub(crate) is_leader: bool,
    pub(crate) has_decided: bool,
    pub(crate) candidacy_sent: bool,
    pub(crate) election_counter: u16,
    pub(crate) pending_priority_election: bool,

    // Liveness
    pub(crate) liveness_counter: u16,

    // Gossip schedule, in ticks
    pub(crate) ticks: u32,
    pub(crate) next_share_at: u32,

    pub(crate) indicator: Rgb,

    pub(crate) neighbors: NeighborTable,
    pub(crate) queue: OutboundQueue,

    metrics: NodeMetrics,

    _config: PhantomData<Cfg>,
}

impl<I, A, Cfg> Node<I, A, Cfg>
where
    I: Integrity,
    A: Actuator,
    Cfg: RingConfig,
{
    /// Create a node with a random non-zero id.
    pub fn new(integrity: I, actuator: A, random: &mut impl Random) -> Self {
        let id = random.gen_range(1, NodeId::MAX as u64 + 1) as NodeId;
        Self::with_id(id, integrity, actuator)
    }

    /// Create a node with a given id. Id `0` is reserved and must not be used.
    pub fn with_id(id: NodeId, integrity: I, mut actuator: A) -> Self {
        debug_assert_ne!(id, NO_ID, "node id 0 is reserved");

        let null = Frame::null(&integrity);
        actuator.set_motion(Motion::Stop);
        actuator.set_indicator(Rgb::OFF);

        Self {
            integrity,
            actuator,

            events: Channel::new(),

            id,
            color_id: id,
            designated_initiator: false,

            left_id: id,
            right_id: id,
            role: Role::Autonomous,

            leader_id: id,
            is_leader: false,
            has_decided: false,
            candidacy_sent: false,
            election_counter: 0,
            pending_priority_election: false,

            liveness_counter: 0,

            ticks: 0,
            next_share_at: Cfg::SHARE_PERIOD,

            indicator: Rgb::OFF,

            neighbors: NeighborTable::new(Cfg::MAX_NEIGHBORS),
            queue: OutboundQueue::new(Cfg::QUEUE_CAPACITY, Cfg::TRANSMIT_COPIES, null),

            metrics: NodeMetrics::default(),

            _config: PhantomData,
        }
    }

    /// Propose this node as leader as soon as it has a ring edge, without
    /// waiting for the election counter.
    pub fn with_designated_initiator(mut self) -> Self {
        self.designated_initiator = true;
        self
    }

    /// Install a known ring edge and become cooperative.
    pub fn seed_ring(&mut self, left: NodeId, right: NodeId) {
        self.left_id = left;
        self.right_id = right;
        self.role = Role::Cooperative;
        self.indicator = Rgb::NEUTRAL;
        self.push_event(Event::RingChanged { left, right });
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn left_id(&self) -> NodeId {
        self.left_id
    }

    pub fn right_id(&self) -> NodeId {
        self.right_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Linked to itself on both sides.
    pub fn is_unpaired(&self) -> bool {
        self.left_id == self.id && self.right_id == self.id
    }

    pub fn color_id(&self) -> NodeId {
        self.color_id
    }

    pub fn leader_id(&self) -> NodeId {
        self.leader_id
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    pub fn has_decided(&self) -> bool {
        self.has_decided
    }

    pub fn is_designated_initiator(&self) -> bool {
        self.designated_initiator
    }

    pub fn election_counter(&self) -> u16 {
        self.election_counter
    }

    pub fn liveness_counter(&self) -> u16 {
        self.liveness_counter
    }

    pub fn pending_priority_election(&self) -> bool {
        self.pending_priority_election
    }

    pub fn indicator(&self) -> Rgb {
        self.indicator
    }

    /// Ticks run since startup.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    /// Channel for protocol events.
    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// Traffic and recovery counters.
    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn integrity(&self) -> &I {
        &self.integrity
    }

    /// Snapshot own state into a frame of `kind` and queue it.
    ///
    /// The frame is addressed to the current right partner. Returns false
    /// when the queue is full.
    pub(crate) fn enqueue(&mut self, kind: MessageKind) -> bool {
        let mut frame = Frame {
            kind,
            id: self.id,
            right_id: self.right_id,
            left_id: self.left_id,
            role: self.role,
            receiver: self.right_id,
            sender: self.id,
            color_id: self.color_id,
            leader_id: self.leader_id,
            integrity: 0,
        };
        frame.seal(&self.integrity);
        self.queue.push(frame)
    }

    /// Push an event to the events channel.
    pub(crate) fn push_event(&mut self, event: Event) {
        let _ = self.events.try_send(event);
    }

    pub(crate) fn set_motion(&mut self, motion: Motion) {
        self.actuator.set_motion(motion);
    }

    pub(crate) fn reset_color_id(&mut self) {
        self.color_id = self.id;
    }

    fn push_indicator(&mut self) {
        self.actuator.set_indicator(self.indicator);
    }

    // Metrics tracking methods

    pub(crate) fn record_received(&mut self) {
        self.metrics.frames_received = self.metrics.frames_received.saturating_add(1);
    }

    pub(crate) fn record_rejected(&mut self) {
        self.metrics.frames_rejected = self.metrics.frames_rejected.saturating_add(1);
    }

    pub(crate) fn record_transmitted(&mut self) {
        self.metrics.frames_transmitted = self.metrics.frames_transmitted.saturating_add(1);
    }

    pub(crate) fn record_dropped(&mut self) {
        self.metrics.frames_dropped = self.metrics.frames_dropped.saturating_add(1);
    }

    pub(crate) fn record_election_deferred(&mut self) {
        self.metrics.elections_deferred = self.metrics.elections_deferred.saturating_add(1);
    }

    pub(crate) fn record_reset(&mut self) {
        self.metrics.resets = self.metrics.resets.saturating_add(1);
    }
}

impl<I, A, Cfg> RadioHandler for Node<I, A, Cfg>
where
    I: Integrity,
    A: Actuator,
    Cfg: RingConfig,
{
    fn on_receive(&mut self, data: &[u8], distance: u16) {
        let frame = match Frame::decode_verified(data, &self.integrity) {
            Ok(f) => f,
            Err(e) => {
                trace!("node {}: discarding frame: {}", self.id, e);
                self.record_rejected();
                return;
            }
        };

        if frame.is_null() {
            return;
        }
        self.record_received();

        self.neighbors
            .record_sighting(self.id, &frame, distance, Cfg::ACCEPTANCE_RADIUS);

        match frame.kind {
            MessageKind::Join => self.handle_join(&frame),
            MessageKind::Elect => self.handle_elect(&frame),
            // Sighting only
            MessageKind::Share | MessageKind::Leave | MessageKind::Move | MessageKind::Null => {}
        }
    }

    fn next_to_transmit(&self) -> &Frame {
        self.queue.peek_next()
    }

    fn on_transmitted(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        self.record_transmitted();
        if let Some(frame) = self.queue.acknowledge_transmission() {
            trace!(
                "node {}: {:?} to {} retired after {} copies",
                self.id,
                frame.kind,
                frame.receiver,
                Cfg::TRANSMIT_COPIES
            );
        }
    }

    fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);

        self.drain_pending_election();
        self.check_liveness();
        self.send_join();
        self.send_share();
        self.attempt_candidacy();
        self.set_closest_neighbors();
        self.push_indicator();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers shared by the node-level unit tests.

    use super::*;
    use crate::traits::test_impls::{MockActuator, XxIntegrity};
    use crate::types::FRAME_LEN;

    pub type TestNode = Node<XxIntegrity, MockActuator>;

    pub fn node(id: NodeId) -> TestNode {
        TestNode::with_id(id, XxIntegrity, MockActuator::new())
    }

    /// Frame as peer `id` would send it.
    pub fn peer_frame(
        kind: MessageKind,
        id: NodeId,
        left: NodeId,
        right: NodeId,
        role: Role,
        leader: NodeId,
    ) -> [u8; FRAME_LEN] {
        let mut frame = Frame {
            kind,
            id,
            right_id: right,
            left_id: left,
            role,
            receiver: right,
            sender: id,
            color_id: id,
            leader_id: leader,
            integrity: 0,
        };
        frame.seal(&XxIntegrity);
        frame.to_bytes()
    }

    pub fn share(id: NodeId, left: NodeId, right: NodeId, role: Role) -> [u8; FRAME_LEN] {
        peer_frame(MessageKind::Share, id, left, right, role, id)
    }

    /// Drain every queued frame through the transmit callback.
    pub fn flush(node: &mut TestNode) -> alloc::vec::Vec<Frame> {
        let mut sent = alloc::vec::Vec::new();
        while !node.queue().is_empty() {
            sent.push(*node.next_to_transmit());
            node.on_transmitted();
        }
        sent
    }

    pub fn drain_events(node: &TestNode) -> alloc::vec::Vec<Event> {
        let mut events = alloc::vec::Vec::new();
        while let Ok(e) = node.events().try_receive() {
            events.push(e);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::traits::test_impls::{MockActuator, MockRandom, XxIntegrity};

    #[test]
    fn test_initial_state() {
        let node = node(42);
        assert_eq!(node.id(), 42);
        assert!(node.is_unpaired());
        assert_eq!(node.role(), Role::Autonomous);
        assert_eq!(node.leader_id(), 42);
        assert_eq!(node.color_id(), 42);
        assert!(!node.is_leader());
        assert!(!node.has_decided());
        assert!(node.neighbors().is_empty());
        assert!(node.next_to_transmit().is_null());
        assert_eq!(node.actuator().motion, Some(Motion::Stop));
        assert_eq!(node.actuator().indicator, Rgb::OFF);
    }

    #[test]
    fn test_random_id_is_nonzero() {
        let mut rng = MockRandom::with_seed(7);
        for _ in 0..200 {
            let node = TestNode::new(XxIntegrity, MockActuator::new(), &mut rng);
            assert_ne!(node.id(), NO_ID);
        }
    }

    #[test]
    fn test_first_share_after_period() {
        let mut node = node(5);
        for _ in 0..9 {
            node.tick();
            assert!(node.queue().is_empty());
        }
        node.tick();
        let f = *node.next_to_transmit();
        assert_eq!(f.kind, MessageKind::Share);
        assert_eq!(f.id, 5);
        assert_eq!(f.sender, 5);
        assert_eq!(f.receiver, 5);
        assert_eq!(f.color_id, 5);
    }

    #[test]
    fn test_share_transmitted_three_times() {
        let mut node = node(5);
        for _ in 0..10 {
            node.tick();
        }
        for _ in 0..3 {
            assert_eq!(node.next_to_transmit().kind, MessageKind::Share);
            node.on_transmitted();
        }
        assert!(node.next_to_transmit().is_null());
        node.on_transmitted();
        assert_eq!(node.metrics().frames_transmitted, 3);
    }

    #[test]
    fn test_corrupt_frame_has_no_effect() {
        let mut node = node(5);
        let mut bytes = share(9, 9, 9, Role::Autonomous);
        bytes[1] ^= 0xff;
        node.on_receive(&bytes, 10);
        node.on_receive(&bytes[..5], 10);
        assert!(node.neighbors().is_empty());
        assert_eq!(node.metrics().frames_rejected, 2);
        assert_eq!(node.metrics().frames_received, 0);
    }

    #[test]
    fn test_counters_saturate() {
        let mut node = node(5);
        node.metrics.frames_rejected = u32::MAX;
        node.metrics.resets = u32::MAX;
        node.on_receive(&[0u8; 4], 10);
        node.reset();
        assert_eq!(node.metrics().frames_rejected, u32::MAX);
        assert_eq!(node.metrics().resets, u32::MAX);
    }

    #[test]
    fn test_null_frame_is_not_a_sighting() {
        let mut node = node(5);
        let null = Frame::null(&XxIntegrity).to_bytes();
        node.on_receive(&null, 10);
        assert!(node.neighbors().is_empty());
        assert_eq!(node.metrics().frames_received, 0);
    }

    #[test]
    fn test_every_kind_counts_as_sighting() {
        let mut node = node(5);
        node.on_receive(&peer_frame(MessageKind::Move, 7, 7, 7, Role::Autonomous, 7), 10);
        node.on_receive(&peer_frame(MessageKind::Leave, 8, 8, 8, Role::Autonomous, 8), 10);
        node.on_receive(&peer_frame(MessageKind::Elect, 9, 3, 4, Role::Cooperative, 9), 10);
        assert_eq!(node.neighbors().len(), 3);
        assert_eq!(node.neighbors().get(9).unwrap().right_id, 4);
    }

    #[test]
    fn test_seed_ring_emits_event() {
        let mut node = node(5);
        node.seed_ring(3, 8);
        assert_eq!(node.role(), Role::Cooperative);
        assert_eq!((node.left_id(), node.right_id()), (3, 8));
        assert_eq!(drain_events(&node), [Event::RingChanged { left: 3, right: 8 }]);
    }

    #[test]
    fn test_enqueued_frame_snapshots_state() {
        let mut node = node(5);
        node.seed_ring(3, 8);
        assert!(node.enqueue(MessageKind::Share));
        let f = *node.next_to_transmit();
        assert_eq!(f.left_id, 3);
        assert_eq!(f.right_id, 8);
        assert_eq!(f.receiver, 8);
        assert_eq!(f.role, Role::Cooperative);
        assert!(XxIntegrity.verify(&f.payload(), f.integrity));
    }
}
