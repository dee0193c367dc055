#![forbid(unsafe_code)]
//! swarmring - ring formation and leader election for robot swarms
//!
//! Per-node control logic for swarms of minimal robots that talk only over a
//! short-range broadcast radio and can estimate the distance to whoever they
//! hear. Using nothing else, the nodes:
//!
//! - discover the peers around them,
//! - organize into a logical ring by picking a left and a right partner,
//! - elect the node with the largest id as the single leader of that ring,
//! - start over on their own when a neighbor goes quiet for too long.
//!
//! This crate is `no_std` but **requires the `alloc` crate**. It is sans-IO:
//! the radio scheduler owns the loop and drives each [`Node`] through
//! [`RadioHandler`].
//!
//! # Key Properties
//!
//! - Fixed 11-byte frames (9-byte payload plus a 16-bit integrity code)
//! - Three hand-offs per frame in place of acknowledgments
//! - Maximum-id election that tolerates duplicates and full queues
//! - No clocks: every timeout is counted in ticks
//!
//! # Example (basic usage)
//!
//! ```
//! use swarmring::{Node, RadioHandler, Role};
//! use swarmring::traits::test_impls::{MockActuator, XxIntegrity};
//!
//! let mut node: Node<_, _> = Node::with_id(7, XxIntegrity, MockActuator::new());
//!
//! // A fresh node is alone and linked to itself
//! assert!(node.is_unpaired());
//! assert_eq!(node.role(), Role::Autonomous);
//!
//! // Nothing queued: the medium is offered the null frame
//! node.tick();
//! assert!(node.next_to_transmit().is_null());
//! node.on_transmitted();
//! ```
//!
//! # Module Structure
//!
//! - [`types`] - Core types (NodeId, Role, MessageKind, Event, etc.)
//! - [`wire`] - Frame layout and codec
//! - [`traits`] - Integrity, Actuator, Random and RadioHandler traits
//! - [`node`] - Main Node struct and the radio callbacks
//! - [`neighbors`] - Neighbor table
//! - [`queue`] - Outbound queue with redundant transmission
//! - [`ring`] - Ring formation (JOIN)
//! - [`election`] - Leader election (ELECT)
//! - [`liveness`] - Timeout-driven reset
//! - [`gossip`] - Periodic Share broadcast
//! - [`config`] - Compile-time bounds and thresholds

#![no_std]

// Prevent test features from being used in release builds.
#[cfg(all(feature = "test-support", not(test), not(debug_assertions)))]
compile_error!(
    "The `test-support` feature must not be enabled in release builds. \
     It includes a mock integrity code that is not a real CRC."
);

extern crate alloc;

pub mod config;
pub mod election;
pub mod gossip;
pub mod liveness;
pub mod neighbors;
pub mod node;
pub mod queue;
pub mod ring;
pub mod traits;
pub mod types;
pub mod wire;

// Re-export main types at crate root
pub use config::{DefaultConfig, RingConfig};
pub use neighbors::{NeighborRecord, NeighborTable};
pub use node::Node;
pub use queue::OutboundQueue;
pub use traits::{Actuator, EventChannel, Integrity, RadioHandler, Random};
pub use types::{Event, MessageKind, Motion, NodeId, NodeMetrics, Rgb, Role, NO_ID};
pub use wire::{DecodeError, Frame};
