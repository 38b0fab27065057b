//! Stream utilities for frame consumers.

mod pace;

pub use pace::{Pace, PaceExt};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delivery rate for a frame subscription.
///
/// Sensor frames arrive whenever the wire completes one, which can be
/// faster than a display wants to repaint. `Throttled` caps delivery
/// with latest-wins semantics; intermediate frames are skipped, never
/// queued.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DisplayRate {
    /// Every completed frame, as soon as it is ready.
    Native,
    /// At most `hz` frames per second, latest frame wins.
    Throttled(u32),
}

impl DisplayRate {
    /// Minimum spacing between delivered frames, if any.
    pub fn period(self) -> Option<Duration> {
        match self {
            DisplayRate::Native => None,
            DisplayRate::Throttled(hz) => {
                Some(Duration::from_secs_f64(1.0 / f64::from(hz.max(1))))
            }
        }
    }
}
