//! Driver spawns and manages the decode task.

use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::decoder::{Decoder, DecoderEvent, DecoderStats};
use crate::framebuf::{FrameBuffer, FrameGeometry};
use crate::source::ByteSource;

/// Result of spawning the decode task.
pub struct DriverChannels {
    /// Receiver for completed frames.
    pub frames: watch::Receiver<Option<Arc<FrameBuffer>>>,
    /// Receiver for running decoder counters.
    pub stats: watch::Receiver<DecoderStats>,
    /// Cancellation token for graceful shutdown.
    pub cancel: CancellationToken,
}

/// Driver spawns and manages the decode task.
///
/// The task owns the byte source and the decoder, pumps bytes through
/// the state machine, and publishes each completed frame on a watch
/// channel. Per-byte decode events never cross the channel; consumers
/// only see frames and counters.
pub struct Driver;

impl Driver {
    /// Spawn the decode task for the given source.
    ///
    /// Returns watch receivers for frames and stats, plus a
    /// cancellation token for graceful shutdown.
    pub fn spawn<S>(source: S, geometry: FrameGeometry) -> DriverChannels
    where
        S: ByteSource,
    {
        let (frame_tx, frame_rx) = watch::channel(None);
        let (stats_tx, stats_rx) = watch::channel(DecoderStats::default());

        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        tokio::spawn(async move {
            Self::decode_task(source, geometry, frame_tx, stats_tx, cancel_task).await;
        });

        DriverChannels { frames: frame_rx, stats: stats_rx, cancel }
    }

    /// Decode task: pump source bytes through the decoder, publish frames.
    async fn decode_task<S>(
        mut source: S,
        geometry: FrameGeometry,
        frame_tx: watch::Sender<Option<Arc<FrameBuffer>>>,
        stats_tx: watch::Sender<DecoderStats>,
        cancel: CancellationToken,
    ) where
        S: ByteSource,
    {
        info!(?geometry, "decode task started");
        let mut decoder = Decoder::with_geometry(geometry);
        let mut error_count = 0u32;
        const MAX_ERRORS: u32 = 10;

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("decode task cancelled");
                    break;
                }
                chunk = source.next_chunk() => chunk,
            };

            match chunk {
                Ok(Some(bytes)) => {
                    error_count = 0;
                    let mut frame_done = false;
                    for byte in bytes {
                        match decoder.feed(byte) {
                            DecoderEvent::FrameReady { frame, recovered } => {
                                frame_done = true;
                                if let Some(discarded) = recovered {
                                    debug!(discarded, "frame completed by recovery sentinel");
                                }
                                if frame_tx.send(Some(frame)).is_err() {
                                    debug!("frame receiver dropped, shutting down");
                                    cancel.cancel();
                                    break;
                                }
                            }
                            DecoderEvent::ResyncStarted(cause) => {
                                warn!(?cause, "decoder entered resync");
                            }
                            DecoderEvent::ResyncRecovered { discarded } => {
                                debug!(discarded, "decoder recovered alignment");
                            }
                            DecoderEvent::RunApplied(_)
                            | DecoderEvent::NeedMore
                            | DecoderEvent::Discarded => {}
                        }
                    }
                    if cancel.is_cancelled() {
                        break;
                    }
                    // One stats publish per chunk, and always after a
                    // frame, keeps the channel cheap to watch.
                    if frame_done || decoder.is_tracing() {
                        let _ = stats_tx.send(decoder.stats());
                    }
                }
                Ok(None) => {
                    // Dropping frame_tx on task exit is the end-of-stream
                    // signal; the watch keeps the final frame readable.
                    info!(stats = ?decoder.stats(), "byte source ended");
                    let _ = stats_tx.send(decoder.stats());
                    break;
                }
                Err(e) => {
                    // Source error - don't tear down on transient failures.
                    error_count += 1;
                    error!("byte source error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("too many source errors, shutting down");
                        let _ = stats_tx.send(decoder.stats());
                        break;
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ...
                    let backoff = std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!(frames = decoder.stats().frames, "decode task ended");
    }
}
