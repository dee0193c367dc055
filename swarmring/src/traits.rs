//! Core traits for the radio boundary, integrity coding, actuation and
//! randomness.
//!
//! These traits allow the protocol to run against different:
//! - Radio drivers (kilobot-style IR, LoRa, simulation)
//! - Integrity codes (hardware CRC, software hash)
//! - Actuators (motors and LEDs, or a recording mock)
//! - Random number generators

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::types::{Event, Motion, Rgb, PAYLOAD_LEN};
use crate::wire::Frame;

/// Queue size for the event channel.
pub(crate) const EVENT_QUEUE_SIZE: usize = 16;

/// Mutex type used for channels.
pub(crate) type ChannelMutex = CriticalSectionRawMutex;

/// Protocol event channel.
pub type EventChannel = Channel<ChannelMutex, Event, EVENT_QUEUE_SIZE>;

/// Integrity code over a frame payload.
///
/// Typically a 16-bit CRC from the radio driver. Any code that detects
/// single-byte corruption works.
pub trait Integrity {
    /// Compute the code for a payload.
    fn code(&self, payload: &[u8; PAYLOAD_LEN]) -> u16;

    /// Check a received code against its payload.
    fn verify(&self, payload: &[u8; PAYLOAD_LEN], code: u16) -> bool {
        self.code(payload) == code
    }
}

/// Physical effects requested by the node.
pub trait Actuator {
    /// Set the status indicator color.
    fn set_indicator(&mut self, color: Rgb);

    /// Set the motor state.
    fn set_motion(&mut self, motion: Motion);
}

/// Random number generator trait.
///
/// Used for:
/// - Node id selection at startup
/// - Simulated loss and corruption
pub trait Random {
    /// Generate a random u64 in the range [min, max).
    fn gen_range(&mut self, min: u64, max: u64) -> u64;

    /// Generate a random f64 in [0, 1).
    fn gen_f64(&mut self) -> f64 {
        self.gen_range(0, 1 << 53) as f64 / (1u64 << 53) as f64
    }
}

/// Callbacks the radio scheduler drives.
///
/// The scheduler owns the loop. Per tick it delivers any received frames via
/// `on_receive`, runs `tick`, offers `next_to_transmit` to the medium and
/// reports a completed hand-off with `on_transmitted`.
pub trait RadioHandler {
    /// A raw frame arrived with the given estimated distance.
    fn on_receive(&mut self, data: &[u8], distance: u16);

    /// The frame to put on the air now. Never fails; returns the null frame
    /// when nothing is queued.
    fn next_to_transmit(&self) -> &Frame;

    /// The medium accepted the frame last returned by `next_to_transmit`.
    fn on_transmitted(&mut self);

    /// One control-loop pass.
    fn tick(&mut self);
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_impls {
    //! Mock implementations of traits for unit testing and doc tests.
    //!
    //! Available when running tests or with the `test-support` feature enabled.

    use alloc::vec::Vec;

    use super::*;

    /// xxh3-based integrity code for tests.
    ///
    /// Folds the 64-bit hash down to 16 bits. Detects any single-byte change
    /// with overwhelming probability.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct XxIntegrity;

    impl Integrity for XxIntegrity {
        fn code(&self, payload: &[u8; PAYLOAD_LEN]) -> u16 {
            let h = xxhash_rust::xxh3::xxh3_64(payload);
            (h ^ (h >> 16) ^ (h >> 32) ^ (h >> 48)) as u16
        }
    }

    /// Actuator that records every requested effect.
    #[derive(Debug, Default)]
    pub struct MockActuator {
        pub indicator: Rgb,
        pub motion: Option<Motion>,
        /// Every indicator change, oldest first.
        pub indicator_history: Vec<Rgb>,
        pub motion_history: Vec<Motion>,
    }

    impl MockActuator {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Actuator for MockActuator {
        fn set_indicator(&mut self, color: Rgb) {
            if self.indicator_history.last() != Some(&color) {
                self.indicator_history.push(color);
            }
            self.indicator = color;
        }

        fn set_motion(&mut self, motion: Motion) {
            self.motion = Some(motion);
            self.motion_history.push(motion);
        }
    }

    /// Mock random for testing (deterministic).
    pub struct MockRandom {
        pub state: u64,
    }

    impl Default for MockRandom {
        fn default() -> Self {
            Self { state: 12345 }
        }
    }

    impl MockRandom {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_seed(seed: u64) -> Self {
            Self { state: seed }
        }
    }

    impl Random for MockRandom {
        fn gen_range(&mut self, min: u64, max: u64) -> u64 {
            // Simple LCG
            self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let range = max - min;
            if range == 0 {
                return min;
            }
            min + ((self.state >> 11) % range)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_impls::*;
    use super::*;

    #[test]
    fn test_xx_integrity_detects_byte_flip() {
        let payload = [1, 2, 3, 4, 1, 3, 2, 2, 9];
        let code = XxIntegrity.code(&payload);
        assert!(XxIntegrity.verify(&payload, code));

        for i in 0..PAYLOAD_LEN {
            let mut bad = payload;
            bad[i] ^= 0x01;
            assert!(!XxIntegrity.verify(&bad, code), "flip at {} not detected", i);
        }
    }

    #[test]
    fn test_mock_random_in_range() {
        let mut rng = MockRandom::with_seed(42);
        for _ in 0..1000 {
            let v = rng.gen_range(1, 256);
            assert!((1..256).contains(&v));
            let f = rng.gen_f64();
            assert!((0.0..1.0).contains(&f));
        }
    }

    #[test]
    fn test_mock_actuator_records_changes() {
        let mut act = MockActuator::new();
        act.set_indicator(Rgb::NEUTRAL);
        act.set_indicator(Rgb::NEUTRAL);
        act.set_indicator(Rgb::LEADER);
        act.set_motion(Motion::Stop);
        assert_eq!(act.indicator, Rgb::LEADER);
        assert_eq!(act.indicator_history, [Rgb::NEUTRAL, Rgb::LEADER]);
        assert_eq!(act.motion, Some(Motion::Stop));
    }
}
