//! Replay source for recorded byte captures.

use tokio::time::{Duration, Interval, interval};
use tracing::debug;

use crate::Result;
use crate::source::ByteSource;

/// Default replay chunk size, roughly one serial read.
const DEFAULT_CHUNK_LEN: usize = 64;

/// Byte source that replays a recorded capture.
///
/// Useful for tests and offline analysis of problematic streams. By
/// default the capture is replayed as fast as the decoder will take
/// it; [`paced`](Self::paced) throttles chunk delivery to approximate
/// the original link speed.
pub struct CaptureSource {
    data: Vec<u8>,
    pos: usize,
    chunk_len: usize,
    pacing: Option<Interval>,
}

impl CaptureSource {
    /// Replay the given bytes at full speed.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        debug!(len = data.len(), "capture source created");
        Self { data, pos: 0, chunk_len: DEFAULT_CHUNK_LEN, pacing: None }
    }

    /// Throttle replay to one chunk of `chunk_len` bytes per `period`.
    ///
    /// A 57600 baud link delivers roughly 5760 bytes per second, so
    /// `paced(64, Duration::from_millis(11))` approximates the real
    /// sensor cadence.
    pub fn paced(mut self, chunk_len: usize, period: Duration) -> Self {
        self.chunk_len = chunk_len.max(1);
        self.pacing = Some(interval(period));
        self
    }

    /// Bytes not yet replayed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

#[async_trait::async_trait]
impl ByteSource for CaptureSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.pos >= self.data.len() {
            debug!("capture exhausted");
            return Ok(None);
        }
        if let Some(pacing) = self.pacing.as_mut() {
            pacing.tick().await;
        }
        let end = (self.pos + self.chunk_len).min(self.data.len());
        let chunk = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(Some(chunk))
    }
}
