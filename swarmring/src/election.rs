//! Leader election around the ring.
//!
//! Maximum-id election in the Chang-Roberts style. A proposal travels
//! rightwards; each node forwards proposals above its own id and absorbs the
//! rest, so only the largest id survives a full traversal and comes back to
//! its originator.
//!
//! Every proposal above the own id is forwarded, including one the node has
//! already seen on an earlier lap, so a leader that restarted can reclaim
//! the ring. Each frame reaches the medium several times; copies that arrive
//! while the node's own forward of the same value is still queued or
//! deferred are dropped.
//!
//! Forwards that find the queue full are not dropped: the node remembers a
//! pending election and re-queues it first thing on the next tick.

use log::{debug, trace, warn};

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
    /// Handle an `Elect` frame carrying proposal `frame.leader_id`.
    pub(crate) fn handle_elect(&mut self, frame: &Frame) {
        if frame.receiver != self.id() {
            return;
        }

        let proposal = frame.leader_id;

        if proposal > self.id() {
            self.has_decided = true;
            self.is_leader = false;
            self.indicator = Rgb::NEUTRAL;

            if proposal > self.leader_id {
                self.leader_id = proposal;
                self.push_event(Event::ElectionDecided { leader: proposal });
            }
            if self.elect_in_flight() {
                trace!("node {}: copy of proposal {} already queued", self.id(), proposal);
                return;
            }

            if self.enqueue(MessageKind::Elect) {
                debug!(
                    "node {}: forwarding proposal {} to {}",
                    self.id(),
                    self.leader_id,
                    self.right_id
                );
            } else {
                warn!(
                    "node {}: queue full, deferring proposal {}",
                    self.id(),
                    self.leader_id
                );
                self.pending_priority_election = true;
                self.record_election_deferred();
            }
        } else if proposal == self.id() {
            if self.is_leader {
                return;
            }
            self.is_leader = true;
            self.has_decided = true;
            self.leader_id = self.id();
            self.indicator = Rgb::LEADER;
            debug!("node {}: elected leader", self.id());
            self.push_event(Event::LeaderElected);
        } else {
            trace!("node {}: absorbing proposal {}", self.id(), proposal);
        }
    }

    /// A forward carrying the current leader belief is queued or deferred.
    fn elect_in_flight(&self) -> bool {
        self.pending_priority_election
            || self
                .queue
                .iter()
                .any(|f| f.kind == MessageKind::Elect && f.leader_id == self.leader_id)
    }

    /// Re-queue a deferred forward. Runs before anything else in a tick.
    pub(crate) fn drain_pending_election(&mut self) {
        if !self.pending_priority_election || self.queue.is_full() {
            return;
        }
        if self.enqueue(MessageKind::Elect) {
            self.pending_priority_election = false;
            debug!(
                "node {}: deferred proposal {} queued",
                self.id(),
                self.leader_id
            );
        }
    }

    /// Propose own id once the node has sat on a ring edge long enough
    /// without hearing a larger proposal.
    ///
    /// A designated initiator skips the wait and marks itself decided when
    /// it proposes.
    pub(crate) fn attempt_candidacy(&mut self) {
        if self.role != Role::Cooperative || self.has_decided {
            return;
        }

        if self.is_designated_initiator() {
            if self.enqueue(MessageKind::Elect) {
                self.has_decided = true;
                self.announce_candidacy();
            }
            return;
        }

        if self.candidacy_sent {
            return;
        }
        if self.election_counter < Cfg::ELECTION_THRESHOLD {
            self.election_counter += 1;
        }
        if self.election_counter >= Cfg::ELECTION_THRESHOLD && self.enqueue(MessageKind::Elect) {
            self.candidacy_sent = true;
            self.announce_candidacy();
        }
    }

    fn announce_candidacy(&mut self) {
        self.indicator = Rgb::CANDIDATE;
        debug!(
            "node {}: proposing self, sent to {}",
            self.id(),
            self.right_id
        );
        self.push_event(Event::CandidacySent);
    }
}
