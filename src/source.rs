//! Byte source trait for serial feeds.

use crate::Result;

/// Trait for wire byte sources.
///
/// Sources abstract over where the sensor stream comes from (a serial
/// port pump, a recorded capture, a test vector) and handle their own
/// timing internally. Absence of data is expressed by awaiting, never
/// by a byte value: a returned chunk always contains real wire bytes,
/// in exact wire order.
#[async_trait::async_trait]
pub trait ByteSource: Send + 'static {
    /// Get the next chunk of wire bytes.
    ///
    /// Returns:
    /// - `Ok(Some(chunk))` - More bytes available (never empty)
    /// - `Ok(None)` - Stream ended (normal termination)
    /// - `Err(e)` - Source failure
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}
