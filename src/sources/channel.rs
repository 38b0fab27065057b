//! Channel-fed byte source for live serial feeds.

use tokio::sync::mpsc;
use tracing::debug;

use crate::Result;
use crate::source::ByteSource;

/// Create a connected sender/source pair.
///
/// The sender side lives with whatever owns the physical link; each
/// read from the port is sent as one chunk, preserving wire order.
/// Dropping the sender ends the stream normally.
pub fn channel_source(capacity: usize) -> (mpsc::Sender<Vec<u8>>, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, ChannelSource { rx })
}

/// Byte source backed by an mpsc channel.
pub struct ChannelSource {
    rx: mpsc::Receiver<Vec<u8>>,
}

#[async_trait::async_trait]
impl ByteSource for ChannelSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            match self.rx.recv().await {
                // Skip empty sends rather than surfacing a useless chunk.
                Some(chunk) if chunk.is_empty() => continue,
                Some(chunk) => return Ok(Some(chunk)),
                None => {
                    debug!("byte channel closed, stream ended");
                    return Ok(None);
                }
            }
        }
    }
}
