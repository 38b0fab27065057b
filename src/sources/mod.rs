//! Byte source implementations.
//!
//! Two sources ship with the crate: [`ChannelSource`] for live feeds
//! pumped by external serial I/O, and [`CaptureSource`] for replaying
//! recorded byte captures. Opening a physical device is deliberately
//! outside this crate; whatever owns the port forwards its bytes into
//! a channel source.

mod capture;
mod channel;

pub use capture::CaptureSource;
pub use channel::{ChannelSource, channel_source};
