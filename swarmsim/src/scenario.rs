//! Scenario builder for setting up and running simulations.

use swarmring::{NodeId, Random};

use crate::event::ScenarioAction;
use crate::metrics::SimulationResult;
use crate::node::{RingNode, SimActuator, SimIntegrity, SimNode, SimRandom};
use crate::sim::{Simulator, DEFAULT_TICK_PERIOD};
use crate::time::{Duration, Timestamp};
use crate::topology::{Link, Topology, DEFAULT_DISTANCE};

/// Salt separating the id stream from the medium's loss stream.
const ID_SEED_SALT: u64 = 0x1d5_1d5_1d5;

#[derive(Debug, Clone)]
enum TopologyType {
    FullyConnected,
    Chain,
    Ring,
    /// First node is the hub.
    Star,
    /// Nodes on a line, `spacing` apart, hearing each other within `radius`.
    Line { radius: f64 },
    Custom(Topology),
}

/// An action scheduled by tick, with nodes named by index.
#[derive(Debug, Clone)]
enum PlannedAction {
    Partition(Vec<Vec<usize>>),
    Heal,
    Snapshot,
    GlobalLossRate(f64),
}

/// Builder for simulation scenarios.
///
/// Nodes are referred to by index; their ids are drawn from the seed when
/// the scenario is built. A topology must be chosen before `build()`.
pub struct ScenarioBuilder {
    num_nodes: usize,
    seed: u64,
    topology_type: Option<TopologyType>,
    loss_rate: f64,
    corruption_rate: f64,
    /// Link distance for graph topologies; node spacing for `line`.
    spacing: u16,
    delay: Duration,
    tick_period: Duration,
    preformed_ring: bool,
    designated_initiator: Option<usize>,
    actions: Vec<(u64, PlannedAction)>,
    snapshot_every: Option<u64>,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ScenarioBuilder {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            seed: 42,
            topology_type: None,
            loss_rate: 0.0,
            corruption_rate: 0.0,
            spacing: DEFAULT_DISTANCE,
            delay: Duration::from_millis(1),
            tick_period: DEFAULT_TICK_PERIOD,
            preformed_ring: false,
            designated_initiator: None,
            actions: Vec::new(),
            snapshot_every: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn topology(mut self, topo: Topology) -> Self {
        self.topology_type = Some(TopologyType::Custom(topo));
        self
    }

    pub fn fully_connected(mut self) -> Self {
        self.topology_type = Some(TopologyType::FullyConnected);
        self
    }

    pub fn chain_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Chain);
        self
    }

    pub fn ring_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Ring);
        self
    }

    pub fn star_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Star);
        self
    }

    /// Place nodes on a line, `spacing` apart; nodes within `radius` hear
    /// each other.
    pub fn line_topology(mut self, radius: f64) -> Self {
        self.topology_type = Some(TopologyType::Line { radius });
        self
    }

    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_corruption_rate(mut self, rate: f64) -> Self {
        self.corruption_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_spacing(mut self, spacing: u16) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Start every node on a ring in index order: node `i` has node `i - 1`
    /// on its left and node `i + 1` on its right, wrapping around.
    pub fn with_preformed_ring(mut self) -> Self {
        self.preformed_ring = true;
        self
    }

    /// Make the node at `index` the designated initiator.
    pub fn with_designated_initiator(mut self, index: usize) -> Self {
        self.designated_initiator = Some(index);
        self
    }

    /// Take a snapshot every `ticks` tick periods.
    pub fn with_snapshot_every(mut self, ticks: u64) -> Self {
        self.snapshot_every = Some(ticks);
        self
    }

    /// Partition the network into groups of node indices at the given tick.
    pub fn partition_at(mut self, tick: u64, groups: Vec<Vec<usize>>) -> Self {
        self.actions.push((tick, PlannedAction::Partition(groups)));
        self
    }

    pub fn heal_at(mut self, tick: u64) -> Self {
        self.actions.push((tick, PlannedAction::Heal));
        self
    }

    pub fn snapshot_at(mut self, tick: u64) -> Self {
        self.actions.push((tick, PlannedAction::Snapshot));
        self
    }

    pub fn loss_rate_at(mut self, tick: u64, rate: f64) -> Self {
        self.actions.push((tick, PlannedAction::GlobalLossRate(rate)));
        self
    }

    /// Build the simulator. Returns it with the node ids in index order.
    ///
    /// # Panics
    ///
    /// Panics if no topology was chosen or more nodes were requested than
    /// there are ids.
    pub fn build(self) -> (Simulator, Vec<NodeId>) {
        assert!(
            self.num_nodes <= usize::from(NodeId::MAX),
            "at most {} nodes have distinct ids",
            NodeId::MAX
        );

        let mut sim = Simulator::new(self.seed).with_tick_period(self.tick_period);
        if let Some(ticks) = self.snapshot_every {
            sim = sim.with_snapshot_interval(self.tick_period * ticks);
        }

        let node_ids = self.add_nodes(&mut sim);

        let link = Link::new()
            .with_distance(self.spacing)
            .with_delay(self.delay)
            .with_loss_rate(self.loss_rate)
            .with_corruption_rate(self.corruption_rate);
        let topo = match self.topology_type {
            Some(TopologyType::FullyConnected) => Topology::fully_connected(&node_ids, link),
            Some(TopologyType::Chain) => Topology::chain(&node_ids, link),
            Some(TopologyType::Ring) => Topology::ring(&node_ids, link),
            Some(TopologyType::Star) => Topology::star(&node_ids, link),
            Some(TopologyType::Line { radius }) => {
                let positions: Vec<(f64, f64)> = (0..node_ids.len())
                    .map(|i| (i as f64 * f64::from(self.spacing), 0.0))
                    .collect();
                Topology::from_positions(&node_ids, &positions, radius, link)
            }
            Some(TopologyType::Custom(t)) => t,
            None => panic!(
                "Topology must be explicitly specified. \
                Use .fully_connected(), .chain_topology(), .ring_topology(), \
                .star_topology(), .line_topology() or .topology()"
            ),
        };
        *sim.topology_mut() = topo;

        if self.preformed_ring && node_ids.len() > 1 {
            let n = node_ids.len();
            for (i, &id) in node_ids.iter().enumerate() {
                let left = node_ids[(i + n - 1) % n];
                let right = node_ids[(i + 1) % n];
                if let Some(node) = sim.node_mut(id) {
                    node.inner_mut().seed_ring(left, right);
                }
            }
        }

        for (tick, action) in self.actions {
            let time = Timestamp::ZERO + self.tick_period * tick;
            let action = match action {
                PlannedAction::Partition(groups) => ScenarioAction::Partition {
                    groups: groups
                        .into_iter()
                        .map(|g| g.into_iter().filter_map(|i| node_ids.get(i).copied()).collect())
                        .collect(),
                },
                PlannedAction::Heal => ScenarioAction::HealPartition,
                PlannedAction::Snapshot => ScenarioAction::TakeSnapshot,
                PlannedAction::GlobalLossRate(rate) => ScenarioAction::SetGlobalLossRate { rate },
            };
            sim.schedule_action(time, action);
        }

        (sim, node_ids)
    }

    /// Draw distinct ids from the seed and add the nodes in index order.
    fn add_nodes(&self, sim: &mut Simulator) -> Vec<NodeId> {
        let mut rng = SimRandom::new(self.seed ^ ID_SEED_SALT);
        let mut ids: Vec<NodeId> = Vec::with_capacity(self.num_nodes);

        for i in 0..self.num_nodes {
            let mut node = draw(&mut rng);
            while ids.contains(&node.id()) {
                node = draw(&mut rng);
            }
            if self.designated_initiator == Some(i) {
                node = node.with_designated_initiator();
            }
            if let Some(id) = sim.add_node(SimNode::from_node(node)) {
                ids.push(id);
            }
        }
        ids
    }

    /// Build and run for the given number of ticks.
    pub fn run_for(self, ticks: u64) -> SimulationResult {
        let (mut sim, _) = self.build();
        sim.run_ticks(ticks)
    }
}

fn draw(rng: &mut impl Random) -> RingNode {
    RingNode::new(SimIntegrity, SimActuator::default(), rng)
}

/// N nodes that all hear each other, starting from scratch.
pub fn simple_scenario(num_nodes: usize) -> ScenarioBuilder {
    ScenarioBuilder::new(num_nodes).fully_connected()
}

/// N nodes already linked into a ring, each hearing only its two partners.
pub fn ring_scenario(num_nodes: usize) -> ScenarioBuilder {
    ScenarioBuilder::new(num_nodes)
        .ring_topology()
        .with_preformed_ring()
}
