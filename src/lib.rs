//! Type-safe decoder for run-length pixel-update streams from serial
//! image sensors.
//!
//! Pixelwire decodes a lossy-tolerant binary framing protocol into
//! double-buffered planar image surfaces (one luma plane, two
//! vertically-subsampled chroma planes). The protocol transmits sparse
//! run-length pixel updates rather than whole frames, so the decoder
//! maintains persistent image state across packets and recovers from
//! stream corruption by resynchronizing on packet-id continuity instead
//! of crashing or silently desynchronizing.
//!
//! # Architecture
//!
//! - [`decoder::Decoder`]: the pure, synchronous state machine. Feed
//!   it one byte at a time, get decode events back. No I/O, no clocks.
//! - [`Connection`]: the async layer. Attach a [`ByteSource`] and
//!   subscribe to completed frames as a `Stream`, with optional display
//!   rate pacing.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use pixelwire::{Connection, DisplayRate, sources::channel_source};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Whatever owns the serial port pumps its reads into `tx`.
//!     let (tx, source) = channel_source(64);
//!     # let _ = tx;
//!     let conn = Connection::attach(source);
//!
//!     let mut frames = Box::pin(conn.frames(DisplayRate::Throttled(30)));
//!     while let Some(frame) = frames.next().await {
//!         // Hand the snapshot to a renderer; it can hold it freely.
//!         println!("frame ready, {} stats", conn.stats().frames);
//!         # let _ = frame;
//!     }
//! }
//! ```
//!
//! The synchronous core is usable on its own, without tokio:
//!
//! ```rust
//! use pixelwire::decoder::{Decoder, DecoderEvent};
//!
//! let mut decoder = Decoder::new();
//! for byte in [0u8, 0, 0, 0, 77, 5, 255] {
//!     if let DecoderEvent::FrameReady { frame, .. } = decoder.feed(byte) {
//!         assert_eq!(frame.row(pixelwire::Channel::Luma, 0)[0], 77);
//!     }
//! }
//! ```

// Core types and error handling
mod error;
pub mod framebuf;
pub mod wire;

// Decode state machine
pub mod decoder;

// Stream-based delivery architecture
pub mod connection;
pub mod driver;
pub mod source;
pub mod sources;
pub mod stream;

// Core exports
pub use error::{PixelwireError, Result};
pub use framebuf::{FrameBuffer, FrameGeometry, FrameStore};
pub use wire::{Channel, PixelRun};

// Decoder exports
pub use decoder::{Decoder, DecoderEvent, DecoderStats, ResyncCause};

// Delivery exports
pub use connection::Connection;
pub use source::ByteSource;
pub use stream::DisplayRate;
