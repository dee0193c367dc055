//! Neighbor table: bounded set of recently heard peers.
//!
//! Records are created on the first accepted sighting of a peer and live
//! until the table is cleared by a liveness reset. There is no eviction; once
//! the table is full, frames from unseen peers are ignored.

use alloc::vec::Vec;

use crate::types::{NodeId, Role, NO_ID};
use crate::wire::Frame;

/// What this node knows about one peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborRecord {
    pub id: NodeId,
    pub left_id: NodeId,
    pub right_id: NodeId,
    pub role: Role,
    /// Estimated distance of the most recent sighting.
    pub distance: u16,
    pub color_id: NodeId,
    /// Consecutive frames seen while the peer was autonomous.
    pub autonomous_shares: u8,
    /// Consecutive frames seen while the peer was cooperative.
    pub cooperative_shares: u8,
    /// Set on any frame from the peer, cleared by the liveness monitor.
    pub heard_this_round: bool,
}

impl NeighborRecord {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            left_id: id,
            right_id: id,
            role: Role::Autonomous,
            distance: 0,
            color_id: id,
            autonomous_shares: 0,
            cooperative_shares: 0,
            heard_this_round: false,
        }
    }

    /// Consecutive shares agreeing with the peer's current role.
    pub fn stable_shares(&self) -> u8 {
        match self.role {
            Role::Autonomous => self.autonomous_shares,
            Role::Cooperative => self.cooperative_shares,
        }
    }

    fn absorb(&mut self, frame: &Frame, distance: u16) {
        self.left_id = frame.left_id;
        self.right_id = frame.right_id;
        self.role = frame.role;
        self.distance = distance;
        self.color_id = frame.color_id;
        self.heard_this_round = true;
        match frame.role {
            Role::Autonomous => {
                self.autonomous_shares = self.autonomous_shares.saturating_add(1);
                self.cooperative_shares = 0;
            }
            Role::Cooperative => {
                self.cooperative_shares = self.cooperative_shares.saturating_add(1);
                self.autonomous_shares = 0;
            }
        }
    }
}

/// Bounded, unordered neighbor table.
#[derive(Clone, Debug)]
pub struct NeighborTable {
    records: Vec<NeighborRecord>,
    capacity: usize,
}

impl NeighborTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, id: NodeId) -> Option<&NeighborRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NeighborRecord> {
        self.records.iter()
    }

    /// Record a frame from a peer.
    ///
    /// Ignored when the sender is `own_id` or the sentinel, when `distance`
    /// exceeds `radius`, or when the peer is new and the table is full.
    /// Returns whether a record was updated or created.
    pub fn record_sighting(
        &mut self,
        own_id: NodeId,
        frame: &Frame,
        distance: u16,
        radius: u16,
    ) -> bool {
        if frame.id == own_id || frame.id == NO_ID || distance > radius {
            return false;
        }

        if let Some(record) = self.records.iter_mut().find(|r| r.id == frame.id) {
            record.absorb(frame, distance);
            return true;
        }

        if self.is_full() {
            return false;
        }

        let mut record = NeighborRecord::new(frame.id);
        record.absorb(frame, distance);
        self.records.push(record);
        true
    }

    /// Every record has at least `threshold` consecutive shares for its
    /// current role. Vacuously true on an empty table.
    pub fn is_consensus_stable(&self, threshold: u8) -> bool {
        self.records.iter().all(|r| r.stable_shares() >= threshold)
    }

    /// Pick the peer to splice next to.
    ///
    /// With only autonomous peers in view this is the nearest one. Otherwise
    /// the candidates are cooperative peers whose right partner is also in
    /// the table, and the winner minimises the distance to the peer plus the
    /// distance to its right partner, i.e. the closest edge.
    pub fn select_join_partner(&self) -> Option<&NeighborRecord> {
        if self.records.iter().all(|r| r.role == Role::Autonomous) {
            return self.nearest();
        }

        self.records
            .iter()
            .filter(|r| r.role == Role::Cooperative)
            .filter_map(|r| {
                let right = self.get(r.right_id)?;
                Some((r, r.distance as u32 + right.distance as u32))
            })
            .min_by_key(|(_, cost)| *cost)
            .map(|(r, _)| r)
    }

    /// Nearest peer; earliest record wins ties.
    pub fn nearest(&self) -> Option<&NeighborRecord> {
        self.records.iter().min_by_key(|r| r.distance)
    }

    /// The two nearest distinct peers, nearest first.
    pub fn nearest_two(&self) -> Option<(NodeId, NodeId)> {
        let first = self.nearest()?;
        let second = self
            .records
            .iter()
            .filter(|r| r.id != first.id)
            .min_by_key(|r| r.distance)?;
        Some((first.id, second.id))
    }

    /// Every peer has been heard since the last clear.
    pub fn all_heard(&self) -> bool {
        self.records.iter().all(|r| r.heard_this_round)
    }

    pub fn clear_heard(&mut self) {
        for record in &mut self.records {
            record.heard_this_round = false;
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageKind;

    const RADIUS: u16 = 90;

    fn share(id: NodeId, left: NodeId, right: NodeId, role: Role) -> Frame {
        Frame {
            kind: MessageKind::Share,
            id,
            right_id: right,
            left_id: left,
            role,
            receiver: right,
            sender: id,
            color_id: id,
            leader_id: id,
            integrity: 0,
        }
    }

    fn auto(id: NodeId) -> Frame {
        share(id, id, id, Role::Autonomous)
    }

    #[test]
    fn test_k_sharers_give_k_records() {
        let mut table = NeighborTable::new(10);
        for id in 1..=7u8 {
            assert!(table.record_sighting(50, &auto(id), 10 + id as u16, RADIUS));
        }
        // Repeat sightings update in place
        for id in 1..=7u8 {
            table.record_sighting(50, &share(id, 3, 4, Role::Cooperative), 20, RADIUS);
        }
        assert_eq!(table.len(), 7);
        for id in 1..=7u8 {
            let r = table.get(id).unwrap();
            assert_eq!(r.left_id, 3);
            assert_eq!(r.right_id, 4);
            assert_eq!(r.role, Role::Cooperative);
            assert_eq!(r.distance, 20);
        }
    }

    #[test]
    fn test_ignored_sightings() {
        let mut table = NeighborTable::new(10);
        assert!(!table.record_sighting(5, &auto(5), 10, RADIUS));
        assert!(!table.record_sighting(5, &auto(NO_ID), 10, RADIUS));
        assert!(!table.record_sighting(5, &auto(6), RADIUS + 1, RADIUS));
        assert!(table.record_sighting(5, &auto(6), RADIUS, RADIUS));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_full_table_drops_unseen() {
        let mut table = NeighborTable::new(10);
        for id in 1..=10u8 {
            table.record_sighting(100, &auto(id), 30, RADIUS);
        }
        assert!(table.is_full());
        assert!(!table.record_sighting(100, &auto(11), 5, RADIUS));
        assert!(!table.contains(11));
        // Known peers still update
        assert!(table.record_sighting(100, &auto(3), 5, RADIUS));
        assert_eq!(table.get(3).unwrap().distance, 5);
        assert_eq!(table.len(), 10);
    }

    #[test]
    fn test_share_counters_exclusive() {
        let mut table = NeighborTable::new(10);
        let roles = [
            Role::Autonomous,
            Role::Autonomous,
            Role::Cooperative,
            Role::Autonomous,
            Role::Cooperative,
            Role::Cooperative,
        ];
        for role in roles {
            table.record_sighting(1, &share(9, 9, 9, role), 10, RADIUS);
            let r = table.get(9).unwrap();
            assert!(
                (r.autonomous_shares == 0) != (r.cooperative_shares == 0),
                "exactly one counter must be nonzero"
            );
        }
        let r = table.get(9).unwrap();
        assert_eq!(r.cooperative_shares, 2);
        assert_eq!(r.autonomous_shares, 0);
    }

    #[test]
    fn test_consensus_stability() {
        let mut table = NeighborTable::new(10);
        assert!(table.is_consensus_stable(3));

        for _ in 0..3 {
            table.record_sighting(1, &auto(2), 10, RADIUS);
        }
        table.record_sighting(1, &auto(3), 10, RADIUS);
        assert!(!table.is_consensus_stable(3));

        table.record_sighting(1, &auto(3), 10, RADIUS);
        table.record_sighting(1, &auto(3), 10, RADIUS);
        assert!(table.is_consensus_stable(3));

        // Role flip restarts the count
        table.record_sighting(1, &share(2, 4, 4, Role::Cooperative), 10, RADIUS);
        assert!(!table.is_consensus_stable(3));
    }

    #[test]
    fn test_join_partner_all_autonomous_picks_nearest() {
        let mut table = NeighborTable::new(10);
        assert!(table.select_join_partner().is_none());
        table.record_sighting(1, &auto(2), 40, RADIUS);
        table.record_sighting(1, &auto(3), 15, RADIUS);
        table.record_sighting(1, &auto(4), 60, RADIUS);
        assert_eq!(table.select_join_partner().unwrap().id, 3);
    }

    #[test]
    fn test_join_partner_minimises_edge() {
        let mut table = NeighborTable::new(10);
        // Edge 10 -> 20 costs 30 + 30; edge 30 -> 40 costs 10 + 70.
        table.record_sighting(1, &share(10, 20, 20, Role::Cooperative), 30, RADIUS);
        table.record_sighting(1, &share(20, 10, 10, Role::Cooperative), 30, RADIUS);
        table.record_sighting(1, &share(30, 40, 40, Role::Cooperative), 10, RADIUS);
        table.record_sighting(1, &share(40, 30, 30, Role::Cooperative), 70, RADIUS);
        // Nearest cooperative peer whose right partner is out of view
        table.record_sighting(1, &share(50, 60, 60, Role::Cooperative), 5, RADIUS);
        table.record_sighting(1, &auto(70), 1, RADIUS);

        let partner = table.select_join_partner().unwrap();
        assert!(partner.id == 10 || partner.id == 20);
    }

    #[test]
    fn test_join_partner_none_without_known_edge() {
        let mut table = NeighborTable::new(10);
        table.record_sighting(1, &share(50, 60, 60, Role::Cooperative), 5, RADIUS);
        table.record_sighting(1, &auto(70), 1, RADIUS);
        assert!(table.select_join_partner().is_none());
    }

    #[test]
    fn test_nearest_two_distinct() {
        let mut table = NeighborTable::new(10);
        table.record_sighting(1, &auto(2), 50, RADIUS);
        assert_eq!(table.nearest_two(), None);
        table.record_sighting(1, &auto(3), 20, RADIUS);
        table.record_sighting(1, &auto(4), 35, RADIUS);
        // Second nearest is the true runner-up, not the first record
        assert_eq!(table.nearest_two(), Some((3, 4)));
    }

    #[test]
    fn test_heard_flags() {
        let mut table = NeighborTable::new(10);
        table.record_sighting(1, &auto(2), 10, RADIUS);
        table.record_sighting(1, &auto(3), 10, RADIUS);
        assert!(table.all_heard());
        table.clear_heard();
        assert!(!table.all_heard());
        table.record_sighting(1, &auto(2), 10, RADIUS);
        assert!(!table.all_heard());
        table.record_sighting(1, &auto(3), 10, RADIUS);
        assert!(table.all_heard());
    }
}
