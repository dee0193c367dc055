//! Compile-time protocol constants.
//!
//! The `RingConfig` trait groups every bound and threshold the node uses.
//! `DefaultConfig` carries the values the swarm is deployed with; tests and
//! simulations can supply their own to shorten timeouts.
//!
//! # Example
//!
//! ```ignore
//! use swarmring::{Node, DefaultConfig, RingConfig};
//!
//! let node = Node::<_, _, DefaultConfig>::with_id(7, integrity, actuator);
//!
//! // Faster election for short simulations
//! struct QuickConfig;
//! impl RingConfig for QuickConfig {
//!     const ELECTION_THRESHOLD: u16 = 5;
//!     // ... other constants
//! }
//! ```

/// Configuration trait for protocol bounds and timeouts.
///
/// All bounds must be non-zero.
pub trait RingConfig {
    /// Maximum neighbor records held at once.
    const MAX_NEIGHBORS: usize;

    /// Maximum outbound frames resident in the queue.
    const QUEUE_CAPACITY: usize;

    /// Hand-offs per outbound frame before it leaves the queue.
    const TRANSMIT_COPIES: u8;

    /// Frames measured farther than this are ignored.
    const ACCEPTANCE_RADIUS: u16;

    /// Consecutive same-role shares needed for a record to count as stable.
    const STABLE_SHARES: u8;

    /// Ticks a Cooperative, undecided node waits before proposing itself.
    const ELECTION_THRESHOLD: u16;

    /// Consecutive ticks without a full neighbor confirmation before reset.
    const LIVENESS_THRESHOLD: u16;

    /// Ticks between own Share frames.
    const SHARE_PERIOD: u32;

    /// Keep neighbor records across a liveness reset.
    const RETAIN_NEIGHBORS_ON_RESET: bool;
}

/// Deployment configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConfig;

impl RingConfig for DefaultConfig {
    const MAX_NEIGHBORS: usize = 10;
    const QUEUE_CAPACITY: usize = 3;
    const TRANSMIT_COPIES: u8 = 3;
    const ACCEPTANCE_RADIUS: u16 = 90;
    const STABLE_SHARES: u8 = 3;
    const ELECTION_THRESHOLD: u16 = 30;
    const LIVENESS_THRESHOLD: u16 = 50;
    const SHARE_PERIOD: u32 = 10;
    const RETAIN_NEIGHBORS_ON_RESET: bool = false;
}
