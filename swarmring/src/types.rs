//! Core types and constants for the swarmring protocol.

use core::fmt;

/// One-byte node identifier, drawn at random on startup.
pub type NodeId = u8;

/// Reserved "no id" sentinel. Frames claiming this sender are ignored.
pub const NO_ID: NodeId = 0;

/// Fixed payload length of every broadcast frame.
pub const PAYLOAD_LEN: usize = 9;

/// Payload plus the 2-byte integrity code.
pub const FRAME_LEN: usize = PAYLOAD_LEN + 2;

// Payload byte positions
pub const POS_KIND: usize = 0;
pub const POS_ID: usize = 1;
pub const POS_RIGHT_ID: usize = 2;
pub const POS_LEFT_ID: usize = 3;
pub const POS_ROLE: usize = 4;
pub const POS_RECEIVER: usize = 5;
pub const POS_SENDER: usize = 6;
pub const POS_COLOR_ID: usize = 7;
pub const POS_LEADER_ID: usize = 8;

/// Whether a node has acquired a ring edge yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Not yet part of a ring edge.
    #[default]
    Autonomous,
    /// Linked to left/right ring neighbors.
    Cooperative,
}

impl Role {
    pub const fn as_u8(self) -> u8 {
        match self {
            Role::Autonomous => 0,
            Role::Cooperative => 1,
        }
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Role::Autonomous),
            1 => Some(Role::Cooperative),
            _ => None,
        }
    }
}

/// Frame kinds carried in the first payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Idle frame offered to the medium when nothing is queued.
    Null,
    /// Periodic gossip of the sender's own state.
    Share,
    /// Ring splice request addressed to a neighbor.
    Join,
    Leave,
    Move,
    /// Leader proposal travelling rightwards around the ring.
    Elect,
}

impl MessageKind {
    pub const fn as_u8(self) -> u8 {
        match self {
            MessageKind::Null => 0,
            MessageKind::Share => 1,
            MessageKind::Join => 2,
            MessageKind::Leave => 3,
            MessageKind::Move => 4,
            MessageKind::Elect => 5,
        }
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(MessageKind::Null),
            1 => Some(MessageKind::Share),
            2 => Some(MessageKind::Join),
            3 => Some(MessageKind::Leave),
            4 => Some(MessageKind::Move),
            5 => Some(MessageKind::Elect),
            _ => None,
        }
    }
}

/// Indicator color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    /// Startup and post-reset state.
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    /// Joined a ring edge, or follower of a decided election.
    pub const NEUTRAL: Rgb = Rgb::new(255, 255, 255);
    /// Own proposal sent, waiting for the ring to answer.
    pub const CANDIDATE: Rgb = Rgb::new(0, 0, 255);
    /// Own proposal came back unchanged.
    pub const LEADER: Rgb = Rgb::new(0, 255, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Motor state requested from the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Stop,
    Forward,
    Left,
    Right,
}

/// Events emitted by the node for harness or application handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A ring edge was acquired or replaced.
    RingChanged { left: NodeId, right: NodeId },
    /// Own id was proposed as leader.
    CandidacySent,
    /// A higher proposal was accepted and forwarded (or deferred).
    ElectionDecided { leader: NodeId },
    /// Own proposal returned after a full ring traversal.
    LeaderElected,
    /// Liveness timeout reset the local state.
    Reset,
}

/// Per-node traffic and recovery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeMetrics {
    /// Non-null frames accepted by `on_receive`.
    pub frames_received: u32,
    /// Frames discarded at the boundary (decode or integrity failure).
    pub frames_rejected: u32,
    /// Hand-offs acknowledged by the medium (null frames excluded).
    pub frames_transmitted: u32,
    /// Share or Join frames not queued because the queue was full.
    pub frames_dropped: u32,
    /// Elect forwards deferred to the priority slot.
    pub elections_deferred: u32,
    /// Local resets, from the liveness monitor or the host.
    pub resets: u32,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Autonomous => write!(f, "autonomous"),
            Role::Cooperative => write!(f, "cooperative"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_bytes_are_stable() {
        for v in 0..=5u8 {
            let kind = MessageKind::from_u8(v).unwrap();
            assert_eq!(kind.as_u8(), v);
        }
        assert_eq!(MessageKind::from_u8(6), None);
        assert_eq!(MessageKind::Elect.as_u8(), 5);
    }

    #[test]
    fn test_role_bytes() {
        assert_eq!(Role::from_u8(0), Some(Role::Autonomous));
        assert_eq!(Role::from_u8(1), Some(Role::Cooperative));
        assert_eq!(Role::from_u8(2), None);
        assert_eq!(Role::default(), Role::Autonomous);
    }

    #[test]
    fn test_frame_len() {
        assert_eq!(PAYLOAD_LEN, 9);
        assert_eq!(FRAME_LEN, 11);
        assert_eq!(POS_LEADER_ID, PAYLOAD_LEN - 1);
    }
}
