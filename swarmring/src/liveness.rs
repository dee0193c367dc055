//! Liveness monitor and local reset.
//!
//! A node expects to hear from every known neighbor between checks. Each
//! tick in which some neighbor is still missing advances a counter; a full
//! round of confirmations clears it. When the counter reaches the threshold
//! the node assumes its view of the ring is stale and starts over.

use log::debug;

use crate::config::RingConfig;
use crate::node::Node;
use crate::traits::{Actuator, Integrity};
use crate::types::{Event, Motion, Rgb, Role};

impl<I, A, Cfg> Node<I, A, Cfg>
where
    I: Integrity,
    A: Actuator,
    Cfg: RingConfig,
{
    pub(crate) fn check_liveness(&mut self) {
        if self.neighbors.is_empty() {
            return;
        }

        if self.neighbors.all_heard() {
            self.neighbors.clear_heard();
            self.liveness_counter = 0;
            return;
        }

        self.liveness_counter += 1;
        if self.liveness_counter >= Cfg::LIVENESS_THRESHOLD {
            debug!(
                "node {}: no full round from {} neighbors in {} ticks",
                self.id(),
                self.neighbors.len(),
                self.liveness_counter
            );
            self.reset();
        }
    }

    /// Return to the startup state, keeping identity and queued frames.
    ///
    /// The liveness monitor calls this on its own; hosts may call it when a
    /// robot is restarted or carried away.
    pub fn reset(&mut self) {
        debug!("node {}: resetting", self.id());

        let id = self.id();
        self.role = Role::Autonomous;
        self.left_id = id;
        self.right_id = id;

        self.leader_id = id;
        self.is_leader = false;
        self.has_decided = false;
        self.candidacy_sent = false;
        self.election_counter = 0;
        self.pending_priority_election = false;

        self.liveness_counter = 0;
        if Cfg::RETAIN_NEIGHBORS_ON_RESET {
            self.neighbors.clear_heard();
        } else {
            self.neighbors.clear();
        }

        self.reset_color_id();
        self.indicator = Rgb::OFF;
        self.set_motion(Motion::Stop);

        self.record_reset();
        self.push_event(Event::Reset);
    }
}
