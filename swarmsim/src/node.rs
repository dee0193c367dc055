//! SimNode wrapper for simulated swarmring nodes.

use swarmring::types::{FRAME_LEN, PAYLOAD_LEN};
use swarmring::{Actuator, Event, Integrity, Motion, Node, NodeId, RadioHandler, Random, Rgb};
use xxhash_rust::xxh3::xxh3_64_with_seed;

const INTEGRITY_SEED: u64 = 0x5eed_0f_a11;

/// Integrity code for simulation: xxh3 folded to 16 bits.
///
/// A damaged frame slips through about once in 65536 tries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimIntegrity;

impl Integrity for SimIntegrity {
    fn code(&self, payload: &[u8; PAYLOAD_LEN]) -> u16 {
        let h = xxh3_64_with_seed(payload, INTEGRITY_SEED);
        (h ^ (h >> 16) ^ (h >> 32) ^ (h >> 48)) as u16
    }
}

/// Actuator that keeps the last requested effects.
#[derive(Debug, Clone, Default)]
pub struct SimActuator {
    pub indicator: Rgb,
    pub motion: Option<Motion>,
    pub indicator_changes: u32,
}

impl Actuator for SimActuator {
    fn set_indicator(&mut self, color: Rgb) {
        if self.indicator != color {
            self.indicator_changes += 1;
        }
        self.indicator = color;
    }

    fn set_motion(&mut self, motion: Motion) {
        self.motion = Some(motion);
    }
}

/// Seeded pseudo-random source (64-bit LCG).
#[derive(Debug, Clone)]
pub struct SimRandom {
    state: u64,
}

impl SimRandom {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }
}

impl Random for SimRandom {
    fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let range = max.saturating_sub(min);
        if range == 0 {
            return min;
        }
        min + ((self.state >> 11) % range)
    }
}

/// Protocol node as hosted by the simulator.
pub type RingNode = Node<SimIntegrity, SimActuator>;

/// A simulated robot: the protocol node plus the events it has emitted.
pub struct SimNode {
    inner: RingNode,
    events: Vec<Event>,
}

impl SimNode {
    /// Create a node with a fixed id.
    pub fn new(id: NodeId) -> Self {
        Self::from_node(RingNode::with_id(id, SimIntegrity, SimActuator::default()))
    }

    /// Create a node with an id drawn from `random`.
    pub fn random(random: &mut impl Random) -> Self {
        Self::from_node(RingNode::new(SimIntegrity, SimActuator::default(), random))
    }

    pub fn from_node(inner: RingNode) -> Self {
        Self {
            inner,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id()
    }

    pub fn inner(&self) -> &RingNode {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut RingNode {
        &mut self.inner
    }

    /// Hand a received frame to the node.
    pub fn receive(&mut self, data: &[u8], distance: u16) {
        self.inner.on_receive(data, distance);
        self.collect_events();
    }

    /// Run one tick and one transmit slot.
    ///
    /// Returns the frame put on the air, or `None` for the null frame, which
    /// the medium does not carry.
    pub fn tick(&mut self) -> Option<[u8; FRAME_LEN]> {
        self.inner.tick();
        let frame = self.inner.next_to_transmit();
        let bytes = (!frame.is_null()).then(|| frame.to_bytes());
        self.inner.on_transmitted();
        self.collect_events();
        bytes
    }

    /// Take every event emitted so far, oldest first.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn collect_events(&mut self) {
        while let Ok(event) = self.inner.events().try_receive() {
            self.events.push(event);
        }
    }
}
