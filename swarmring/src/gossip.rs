//! Periodic Share broadcast.

use log::trace;

use crate::config::RingConfig;
use crate::node::Node;
use crate::traits::{Actuator, Integrity};
use crate::types::MessageKind;

impl<I, A, Cfg> Node<I, A, Cfg>
where
    I: Integrity,
    A: Actuator,
    Cfg: RingConfig,
{
    /// Queue a Share when one is due. A due share that finds the queue full
    /// is retried on the next tick.
    pub(crate) fn send_share(&mut self) {
        // Ticks until due, modulo the counter's wrap; a postponed share
        // shows up as a huge wait.
        let wait = self.next_share_at.wrapping_sub(self.ticks);
        if wait != 0 && wait < u32::MAX / 2 {
            return;
        }
        if !self.enqueue(MessageKind::Share) {
            trace!("node {}: queue full, share postponed", self.id());
            self.record_dropped();
            return;
        }
        self.next_share_at = self.ticks.wrapping_add(Cfg::SHARE_PERIOD);
    }
}
