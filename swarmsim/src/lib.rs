//! swarmsim - Discrete event simulator for swarmring.
//!
//! Runs many [`swarmring`] nodes in one process against a simulated radio
//! medium, with no real-time delays and fully deterministic ordering.
//!
//! # Features
//!
//! - **Discrete event simulation**: one tick event per node per period
//! - **Configurable topology**: fully connected, chain, ring, star, or planar
//!   positions with a hearing radius
//! - **Link properties**: distance, frame loss, byte corruption, delay
//! - **Scenario builder**: preformed rings, designated initiators, scheduled
//!   partitions and healing
//! - **Metrics collection**: ring snapshots, frame counts, convergence time
//!
//! # Example
//!
//! ```
//! use swarmsim::ring_scenario;
//!
//! // Five nodes already on a ring elect the largest id
//! let result = ring_scenario(5).with_seed(42).run_for(300);
//! assert!(result.converged());
//! ```
//!
//! # Architecture
//!
//! The simulator pops events from a priority queue ordered by
//! (time, sequence number). A tick event runs the node's control loop, then
//! its transmit slot: a non-null frame is copied to every active neighbor
//! with the link's delay, each copy subject to loss and corruption. A
//! delivery event hands the copy to the receiver's `on_receive` with the
//! link's distance.

pub mod event;
pub mod metrics;
pub mod node;
pub mod scenario;
pub mod sim;
pub mod time;
pub mod topology;

pub use event::{Event, ScenarioAction, ScheduledEvent};
pub use metrics::{NodeState, RingSnapshot, SimMetrics, SimulationResult};
pub use node::{RingNode, SimActuator, SimIntegrity, SimNode, SimRandom};
pub use scenario::{ring_scenario, simple_scenario, ScenarioBuilder};
pub use sim::Simulator;
pub use swarmring::NodeId;
pub use time::{Duration, Timestamp};
pub use topology::{Link, Topology};
