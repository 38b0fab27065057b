//! Connection to a decoded sensor stream.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::decoder::DecoderStats;
use crate::driver::{Driver, DriverChannels};
use crate::framebuf::{FrameBuffer, FrameGeometry};
use crate::source::ByteSource;
use crate::stream::{DisplayRate, PaceExt};

/// Handle to a running decode session.
///
/// Attaching a byte source spawns the decode task; the connection is a
/// cheap handle over its watch channels. Multiple subscribers can take
/// frame streams at independent display rates. Dropping the connection
/// cancels the decode task.
pub struct Connection {
    frames: tokio::sync::watch::Receiver<Option<Arc<FrameBuffer>>>,
    stats: tokio::sync::watch::Receiver<DecoderStats>,
    geometry: FrameGeometry,
    cancel: CancellationToken,
}

impl Connection {
    /// Attach to a byte source using the native 512x384 geometry.
    ///
    /// Must be called within a tokio runtime; the decode task is
    /// spawned immediately and begins consuming the source.
    pub fn attach<S: ByteSource>(source: S) -> Self {
        Self::attach_with_geometry(source, FrameGeometry::default())
    }

    /// Attach to a byte source with explicit plane geometry.
    pub fn attach_with_geometry<S: ByteSource>(source: S, geometry: FrameGeometry) -> Self {
        info!(?geometry, "attaching decode session");
        let DriverChannels { frames, stats, cancel } = Driver::spawn(source, geometry);
        Self { frames, stats, geometry, cancel }
    }

    /// Subscribe to completed frames.
    ///
    /// The stream ends when the byte source ends or the connection is
    /// shut down. Each item is an immutable snapshot; holding one never
    /// blocks the decoder.
    pub fn frames(&self, rate: DisplayRate) -> impl Stream<Item = Arc<FrameBuffer>> + 'static {
        // The watch slot holds None until the first frame completes;
        // that is filtered out. The stream terminates when the decode
        // task exits and drops its sender.
        let frames = WatchStream::new(self.frames.clone()).filter_map(|opt| async move { opt });

        match rate.period() {
            None => frames.boxed(),
            Some(period) => frames.pace(period).boxed(),
        }
    }

    /// The most recently completed frame, if any frame has completed.
    ///
    /// Stays at the final frame after the stream ends, so a display can
    /// keep showing the last picture the sensor sent.
    pub fn latest_frame(&self) -> Option<Arc<FrameBuffer>> {
        self.frames.borrow().clone()
    }

    /// Running decoder counters.
    ///
    /// Counters are published on frame boundaries and while resyncing,
    /// so a healthy mid-frame stream may lag by one frame.
    pub fn stats(&self) -> DecoderStats {
        *self.stats.borrow()
    }

    /// Plane geometry of this session.
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Stop the decode task.
    pub fn shutdown(&self) {
        info!("shutting down decode session");
        self.cancel.cancel();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
