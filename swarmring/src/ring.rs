//! Ring formation: JOIN exchange and nearest-neighbor normalization.
//!
//! A node joins by splicing itself into the closest known edge. It takes the
//! edge's left end as its own left partner and the right end as its right
//! partner, then addresses a `Join` to the right end so that node re-points
//! its left side at the newcomer.
//!
//! `set_closest_neighbors` is the fallback that guarantees every node with
//! peers in view ends up with some ring edge even when no JOIN completes.

use log::debug;

use crate::config::RingConfig;
use crate::node::Node;
use crate::traits::{Actuator, Integrity};
use crate::types::{Event, MessageKind, Rgb, Role};
use crate::wire::Frame;

impl<I, A, Cfg> Node<I, A, Cfg>
where
    I: Integrity,
    A: Actuator,
    Cfg: RingConfig,
{
    /// Handle a `Join` frame.
    pub(crate) fn handle_join(&mut self, frame: &Frame) {
        if frame.receiver != self.id() {
            return;
        }

        // The sender names us on one side of itself; it sits on the other
        // side of us.
        if frame.left_id == self.id() {
            self.right_id = frame.sender;
        }
        if frame.right_id == self.id() {
            self.left_id = frame.sender;
        }

        debug!(
            "node {}: join from {}, now {} <- me -> {}",
            self.id(),
            frame.sender,
            self.left_id,
            self.right_id
        );
        self.push_event(Event::RingChanged {
            left: self.left_id,
            right: self.right_id,
        });

        if self.left_id == self.id() || self.right_id == self.id() {
            // Still open on one side: close it with our own join.
            self.send_join();
        } else {
            self.role = Role::Cooperative;
            self.indicator = Rgb::NEUTRAL;
        }
    }

    /// Splice into the closest known edge.
    ///
    /// Requires an autonomous role, a stable neighbor table, room in the
    /// queue and a partner.
    pub(crate) fn send_join(&mut self) {
        if self.role != Role::Autonomous
            || !self.neighbors.is_consensus_stable(Cfg::STABLE_SHARES)
            || self.queue.is_full()
        {
            return;
        }

        let (left, right) = match self.neighbors.select_join_partner() {
            Some(partner) => (partner.id, partner.right_id),
            None => return,
        };

        self.left_id = left;
        self.right_id = right;
        self.become_cooperative();

        // Room was checked above.
        self.enqueue(MessageKind::Join);

        debug!(
            "node {}: joining between {} and {}",
            self.id(),
            left,
            right
        );
        self.push_event(Event::RingChanged { left, right });
    }

    /// Fall back to the nearest peers when no edge was negotiated.
    ///
    /// With a single peer in view both sides collapse to it. With more, a
    /// node still pointing the same way on both sides takes the two nearest.
    pub(crate) fn set_closest_neighbors(&mut self) {
        let (left, right) = match self.neighbors.len() {
            0 => return,
            1 => match self.neighbors.nearest() {
                Some(only) => (only.id, only.id),
                None => return,
            },
            _ if self.left_id == self.right_id => match self.neighbors.nearest_two() {
                Some(pair) => pair,
                None => return,
            },
            _ => return,
        };

        if (left, right) != (self.left_id, self.right_id) {
            self.left_id = left;
            self.right_id = right;
            debug!(
                "node {}: nearest neighbors {} <- me -> {}",
                self.id(),
                left,
                right
            );
            self.push_event(Event::RingChanged { left, right });
        }
        self.become_cooperative();
    }

    /// Promote to cooperative, lighting the neutral indicator on first edge.
    pub(crate) fn become_cooperative(&mut self) {
        if self.role == Role::Autonomous {
            self.role = Role::Cooperative;
            if self.indicator == Rgb::OFF {
                self.indicator = Rgb::NEUTRAL;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::node::testing::*;
    use crate::traits::RadioHandler;
    use crate::types::{Event, MessageKind, Rgb, Role};

    fn hear(node: &mut TestNode, bytes: &[u8], distance: u16, times: usize) {
        for _ in 0..times {
            node.on_receive(bytes, distance);
        }
    }

    #[test]
    fn test_join_splice_between_linked_pair() {
        // A(10) and C(30) already linked; D(50) autonomous and nearest.
        let mut b = node(20);
        hear(&mut b, &share(10, 30, 30, Role::Cooperative), 20, 3);
        hear(&mut b, &share(30, 10, 10, Role::Cooperative), 40, 3);
        hear(&mut b, &share(50, 50, 50, Role::Autonomous), 10, 3);

        b.tick();
        assert_eq!(b.left_id(), 10);
        assert_eq!(b.right_id(), 30);
        assert_eq!(b.role(), Role::Cooperative);

        let join = flush(&mut b)
            .into_iter()
            .find(|f| f.kind == MessageKind::Join)
            .unwrap();
        assert_eq!(join.receiver, 30);
        assert_eq!(join.left_id, 10);
        assert_eq!(join.right_id, 30);

        let mut c = node(30);
        c.seed_ring(10, 10);
        c.on_receive(&join.to_bytes(), 40);
        assert_eq!(c.left_id(), 20);
        assert_eq!(c.right_id(), 10);
        assert_eq!(c.role(), Role::Cooperative);
        assert_eq!(c.indicator(), Rgb::NEUTRAL);
    }

    #[test]
    fn test_two_node_handshake() {
        let mut a = node(10);
        hear(&mut a, &share(20, 20, 20, Role::Autonomous), 30, 3);
        a.tick();
        assert_eq!((a.left_id(), a.right_id()), (20, 20));

        let join = flush(&mut a)[0];
        assert_eq!(join.kind, MessageKind::Join);
        assert_eq!(join.receiver, 20);

        let mut b = node(20);
        b.on_receive(&join.to_bytes(), 30);
        assert_eq!((b.left_id(), b.right_id()), (10, 10));
        assert_eq!(b.role(), Role::Cooperative);
        assert_eq!(b.indicator(), Rgb::NEUTRAL);
    }

    #[test]
    fn test_join_for_other_receiver_only_updates_table() {
        let mut b = node(20);
        let bytes = peer_frame(MessageKind::Join, 10, 40, 30, Role::Cooperative, 10);
        b.on_receive(&bytes, 20);
        assert!(b.is_unpaired());
        assert_eq!(b.role(), Role::Autonomous);
        assert!(b.neighbors().contains(10));
    }

    #[test]
    fn test_half_open_join_reissues() {
        let mut b = node(2);
        // Linked pair 5 <-> 6 in view
        hear(&mut b, &share(5, 6, 6, Role::Cooperative), 30, 3);
        hear(&mut b, &share(6, 5, 5, Role::Cooperative), 30, 3);
        hear(&mut b, &share(1, 9, 2, Role::Cooperative), 50, 3);

        // 1 names us as its right partner only
        let join = peer_frame(MessageKind::Join, 1, 9, 2, Role::Cooperative, 1);
        b.on_receive(&join, 50);

        assert_eq!(b.role(), Role::Cooperative);
        assert!(b.queue().iter().any(|f| f.kind == MessageKind::Join));
        assert_ne!(b.left_id(), b.id());
        assert_ne!(b.right_id(), b.id());
    }

    #[test]
    fn test_send_join_waits_for_stable_table() {
        let mut a = node(10);
        hear(&mut a, &share(20, 20, 20, Role::Autonomous), 30, 2);
        a.send_join();
        assert!(a.queue().is_empty());
        assert!(a.is_unpaired());

        hear(&mut a, &share(20, 20, 20, Role::Autonomous), 30, 1);
        a.send_join();
        assert_eq!(a.queue().len(), 1);
    }

    #[test]
    fn test_send_join_needs_queue_room() {
        let mut a = node(10);
        hear(&mut a, &share(20, 20, 20, Role::Autonomous), 30, 3);
        for _ in 0..3 {
            a.enqueue(MessageKind::Share);
        }
        a.send_join();
        assert!(a.is_unpaired());
        assert_eq!(a.role(), Role::Autonomous);
    }

    #[test]
    fn test_single_neighbor_collapses() {
        let mut a = node(10);
        hear(&mut a, &share(20, 20, 20, Role::Cooperative), 30, 1);
        a.set_closest_neighbors();
        assert_eq!((a.left_id(), a.right_id()), (20, 20));
        assert_eq!(a.role(), Role::Cooperative);
        assert_eq!(drain_events(&a), [Event::RingChanged { left: 20, right: 20 }]);

        // Idempotent
        a.set_closest_neighbors();
        assert!(drain_events(&a).is_empty());
    }

    #[test]
    fn test_nearest_two_assigned_when_self_paired() {
        let mut a = node(10);
        hear(&mut a, &share(20, 20, 20, Role::Cooperative), 60, 1);
        hear(&mut a, &share(30, 30, 30, Role::Cooperative), 15, 1);
        hear(&mut a, &share(40, 40, 40, Role::Cooperative), 35, 1);
        a.set_closest_neighbors();
        assert_eq!((a.left_id(), a.right_id()), (30, 40));
        assert_eq!(a.role(), Role::Cooperative);
    }

    #[test]
    fn test_established_edge_left_alone() {
        let mut a = node(10);
        a.seed_ring(20, 40);
        hear(&mut a, &share(20, 20, 20, Role::Cooperative), 60, 1);
        hear(&mut a, &share(30, 30, 30, Role::Cooperative), 15, 1);
        hear(&mut a, &share(40, 40, 40, Role::Cooperative), 35, 1);
        a.set_closest_neighbors();
        assert_eq!((a.left_id(), a.right_id()), (20, 40));
    }
}
