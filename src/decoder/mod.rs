//! Packet framing, decoding, and resynchronization state machine.
//!
//! [`Decoder`] is the composition root of the pure decode pipeline: the
//! [`PacketAssembler`] builds packets field by field, the
//! [`ResyncMonitor`] scans for realignment after corruption, and the
//! frame store applies decoded runs to the back buffer. It is a synchronous state machine
//! driven one byte at a time through [`Decoder::feed`]; it owns no I/O
//! and never blocks, which is what makes the protocol logic testable
//! without a serial device or a display (the async driver pumps it in
//! production).
//!
//! Per-byte errors never escape as `Err`: framing and payload
//! corruption are recoverable by design and surface as
//! [`DecoderEvent::ResyncStarted`], after which bytes are discarded
//! until alignment is re-established. The one liveness hazard is a
//! stream that never reproduces the expected id or the sentinel; the
//! decoder stays tracing forever and only the [`DecoderStats`] counters
//! show it. Callers wanting a hard failure must impose their own
//! timeout around the feed loop.

mod assembler;
mod resync;

pub use assembler::{FieldOutcome, PacketAssembler, PacketField};
pub use resync::{ResyncMonitor, TraceOutcome};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::PixelwireError;
use crate::framebuf::{FrameBuffer, FrameGeometry, FrameStore};
use crate::wire::PixelRun;

/// Why the decoder entered resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResyncCause {
    /// Id byte broke sequence continuity.
    IdMismatch { expected: u8, got: u8 },
    /// Payload decoded to the reserved channel encoding.
    InvalidChannel { bits: u8 },
    /// Payload decoded to a run outside its plane. The id check passed
    /// coincidentally; alignment cannot be trusted.
    OutOfBounds { run: PixelRun },
}

/// Result of feeding one byte to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// Byte accepted into the packet in progress.
    NeedMore,
    /// A complete packet decoded and its run was applied to the back
    /// buffer.
    RunApplied(PixelRun),
    /// Frame-end sentinel observed: buffers swapped, the new front is
    /// ready for display. When the sentinel also ended a resync episode,
    /// `recovered` carries the number of bytes discarded during it;
    /// `None` means a clean frame boundary.
    FrameReady { frame: Arc<FrameBuffer>, recovered: Option<u64> },
    /// Corruption detected; subsequent bytes are treated as candidate
    /// ids until alignment is re-established.
    ResyncStarted(ResyncCause),
    /// The expected id reappeared; assembly resumes with the matched id
    /// already consumed. Carries the number of bytes discarded during
    /// the episode.
    ResyncRecovered { discarded: u64 },
    /// Byte discarded while scanning for realignment.
    Discarded,
}

/// Running counters, readable at any time without side effects.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderStats {
    /// Runs decoded and applied to a back buffer.
    pub applied_packets: u64,
    /// Candidate bytes discarded while tracing for realignment.
    pub lost_packets: u64,
    /// Completed frames (buffer swaps).
    pub frames: u64,
    /// Resync episodes entered.
    pub resyncs_started: u64,
    /// Resync episodes exited (via id match or sentinel).
    pub resyncs_recovered: u64,
}

/// The single entry point for the decode pipeline.
///
/// One instance per stream. All state lives here; there are no process
/// globals. Bytes must be fed in exact wire order, and every state
/// transition completes within one [`feed`](Self::feed) call.
#[derive(Debug)]
pub struct Decoder {
    assembler: PacketAssembler,
    tracing: Option<ResyncMonitor>,
    store: FrameStore,
    stats: DecoderStats,
}

impl Decoder {
    /// Decoder for the native 512x384 sensor geometry.
    pub fn new() -> Self {
        Self::with_geometry(FrameGeometry::default())
    }

    /// Decoder over explicit plane geometry.
    pub fn with_geometry(geometry: FrameGeometry) -> Self {
        Self {
            assembler: PacketAssembler::new(),
            tracing: None,
            store: FrameStore::new(geometry),
            stats: DecoderStats::default(),
        }
    }

    /// Consume one byte from the wire.
    pub fn feed(&mut self, byte: u8) -> DecoderEvent {
        trace!(byte, "feed");
        if self.tracing.is_some() {
            return self.feed_tracing(byte);
        }
        match self.assembler.accept(byte) {
            FieldOutcome::NeedMore => DecoderEvent::NeedMore,
            FieldOutcome::FrameEndMarker => {
                DecoderEvent::FrameReady { frame: self.finish_frame(), recovered: None }
            }
            FieldOutcome::PacketComplete(run) => match self.store.apply_run(&run) {
                Ok(()) => {
                    self.stats.applied_packets += 1;
                    DecoderEvent::RunApplied(run)
                }
                Err(err) => {
                    debug_assert!(matches!(err, PixelwireError::OutOfBounds { .. }));
                    self.start_resync(ResyncCause::OutOfBounds { run })
                }
            },
            FieldOutcome::FramingError { expected, got } => {
                self.start_resync(ResyncCause::IdMismatch { expected, got })
            }
            FieldOutcome::InvalidChannel { bits } => {
                self.start_resync(ResyncCause::InvalidChannel { bits })
            }
        }
    }

    /// Counters snapshot.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Whether the decoder is currently scanning for realignment.
    pub fn is_tracing(&self) -> bool {
        self.tracing.is_some()
    }

    /// The most recently completed frame.
    pub fn front(&self) -> Arc<FrameBuffer> {
        self.store.front()
    }

    /// Plane geometry of this session's buffers.
    pub fn geometry(&self) -> FrameGeometry {
        self.store.front().geometry()
    }

    fn feed_tracing(&mut self, byte: u8) -> DecoderEvent {
        let expected = self.assembler.expected_id();
        let Some(monitor) = self.tracing.as_mut() else {
            return DecoderEvent::NeedMore;
        };
        let outcome = monitor.trace(byte, expected);
        let discarded = monitor.discarded();
        match outcome {
            TraceOutcome::Discarded => {
                self.stats.lost_packets += 1;
                DecoderEvent::Discarded
            }
            TraceOutcome::MatchedId(id) => {
                self.tracing = None;
                self.stats.resyncs_recovered += 1;
                self.assembler.resume_after_id(id);
                debug!(id, discarded, "resync recovered on expected id");
                DecoderEvent::ResyncRecovered { discarded }
            }
            TraceOutcome::MatchedFrameEnd => {
                // Sentinel recovery doubles as the frame boundary: the
                // same swap a clean frame end performs.
                self.tracing = None;
                self.stats.resyncs_recovered += 1;
                debug!(discarded, "resync recovered on frame-end sentinel");
                DecoderEvent::FrameReady { frame: self.finish_frame(), recovered: Some(discarded) }
            }
        }
    }

    fn start_resync(&mut self, cause: ResyncCause) -> DecoderEvent {
        // Every error path leaves the assembler cursor at the id field,
        // so tracing always re-interprets bytes as candidate ids.
        warn!(?cause, "stream corruption detected, entering resync");
        self.tracing = Some(ResyncMonitor::new());
        self.stats.resyncs_started += 1;
        DecoderEvent::ResyncStarted(cause)
    }

    fn finish_frame(&mut self) -> Arc<FrameBuffer> {
        let front = self.store.swap_and_reset();
        self.assembler.reset_frame();
        self.stats.frames += 1;
        front
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
