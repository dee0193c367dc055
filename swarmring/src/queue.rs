//! Outbound queue with redundant transmission.
//!
//! The medium gives no acknowledgments, so every frame is handed to the
//! radio a fixed number of times before it leaves the queue. Only the head
//! frame is ever on the air; its hand-off count lives here, not in the frame.

use alloc::collections::VecDeque;

use crate::wire::Frame;

/// Bounded FIFO of pending frames.
#[derive(Clone, Debug)]
pub struct OutboundQueue {
    frames: VecDeque<Frame>,
    capacity: usize,
    copies: u8,
    /// Hand-offs of the head frame so far.
    head_sent: u8,
    null: Frame,
}

impl OutboundQueue {
    /// `null` is returned by `peek_next` when the queue is empty.
    pub fn new(capacity: usize, copies: u8, null: Frame) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            copies,
            head_sent: 0,
            null,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.capacity
    }

    /// Append a frame. Returns false, leaving the queue untouched, when full.
    pub fn push(&mut self, frame: Frame) -> bool {
        if self.is_full() {
            return false;
        }
        self.frames.push_back(frame);
        true
    }

    /// Head frame, or the null frame when empty.
    pub fn peek_next(&self) -> &Frame {
        self.frames.front().unwrap_or(&self.null)
    }

    /// Hand-offs already made for the head frame.
    pub fn head_transmissions(&self) -> u8 {
        self.head_sent
    }

    /// Count one hand-off of the head frame.
    ///
    /// Returns the frame once it has been sent the configured number of
    /// times and removed. A hand-off of the null frame is not counted.
    pub fn acknowledge_transmission(&mut self) -> Option<Frame> {
        if self.frames.is_empty() {
            return None;
        }
        self.head_sent += 1;
        if self.head_sent < self.copies {
            return None;
        }
        self.head_sent = 0;
        self.frames.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}
