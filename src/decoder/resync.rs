//! Realignment scanning after a detected framing or payload error.
//!
//! Once byte alignment is lost there is no way to tell which position
//! within a packet the stream is at, so every byte received while
//! tracing is re-interpreted as a candidate id byte rather than as a
//! continuation of a 6-field packet. The protocol is self-synchronizing
//! only through id continuity and the frame-end sentinel: scanning ends
//! when one of the two reappears, and never otherwise. There is no
//! give-up threshold; a stream that never reproduces a matching byte
//! keeps the monitor tracing, visible to callers only through the loss
//! counters.

use crate::wire::FRAME_END;

/// What a traced byte turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    /// Not a match; byte discarded, still tracing.
    Discarded,
    /// Byte equals the expected id: alignment re-established, the id is
    /// consumed, and packet assembly resumes at the next field.
    MatchedId(u8),
    /// Byte is the frame-end sentinel: alignment re-established via the
    /// frame boundary, which also completes the current frame.
    MatchedFrameEnd,
}

/// Scanner state for one recovery episode.
///
/// Created when the decoder detects corruption, dropped on recovery.
#[derive(Debug)]
pub struct ResyncMonitor {
    discarded: u64,
}

impl ResyncMonitor {
    pub fn new() -> Self {
        Self { discarded: 0 }
    }

    /// Candidate bytes discarded so far in this episode.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Examine one byte as a candidate id.
    pub fn trace(&mut self, byte: u8, expected_id: u8) -> TraceOutcome {
        if byte == FRAME_END {
            TraceOutcome::MatchedFrameEnd
        } else if byte == expected_id {
            TraceOutcome::MatchedId(byte)
        } else {
            self.discarded += 1;
            TraceOutcome::Discarded
        }
    }
}

impl Default for ResyncMonitor {
    fn default() -> Self {
        Self::new()
    }
}
