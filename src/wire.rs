//! Wire-level bit layout of the sensor protocol.
//!
//! One data packet is six bytes, fixed order:
//!
//! ```text
//! | ID | Y_MSB | X_MSB | MISC | VALUE | AMOUNT_LSB |
//! ```
//!
//! The `MISC` byte packs four sub-fields (bit 7 = MSB):
//!
//! ```text
//! | x_lsb (1) | y_lsb (1) | channel (2) | amount_msbs (4) |
//! ```
//!
//! Coordinates are split across a whole-byte MSB half and a single LSB
//! bit in `MISC`; run lengths are a 12-bit quantity split 4 + 8. The id
//! byte counts `0..=254` modulo [`SEQ_MODULO`]; [`FRAME_END`] (255) is
//! reserved as the one-byte frame-complete sentinel and is never a
//! valid data id.
//!
//! Everything here is pure and stateless. The decode direction is used
//! by the packet assembler; the encode direction exists for simulated
//! sources, benches, and tests.

use serde::{Deserialize, Serialize};

use crate::error::{PixelwireError, Result};

/// Number of bytes in one data packet.
pub const PACKET_LEN: usize = 6;

/// Reserved id value signaling "frame complete, swap buffers".
pub const FRAME_END: u8 = 255;

/// Data packet ids live in `0..SEQ_MODULO` and wrap there.
pub const SEQ_MODULO: u8 = 255;

/// Native sensor frame width in pixels.
pub const FRAME_WIDTH: usize = 512;

/// Native sensor frame height in pixels (luma plane).
pub const FRAME_HEIGHT: usize = 384;

/// The id expected after `id` on a healthy stream.
pub fn next_id(id: u8) -> u8 {
    id.wrapping_add(1) % SEQ_MODULO
}

/// One of the three image planes carried by the protocol.
///
/// Chroma planes are vertically subsampled to half the luma height;
/// horizontal resolution is identical across planes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Full-resolution luminance plane.
    Luma,
    /// Half-height U chrominance plane.
    ChromaU,
    /// Half-height V chrominance plane.
    ChromaV,
}

impl Channel {
    /// All channels, in wire-encoding order.
    pub const ALL: [Channel; 3] = [Channel::Luma, Channel::ChromaU, Channel::ChromaV];

    /// Map the two channel bits of the `MISC` byte to a channel.
    ///
    /// The encoding has room for four values but only three planes;
    /// `0b11` is rejected as [`PixelwireError::InvalidChannel`].
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            0 => Ok(Channel::Luma),
            1 => Ok(Channel::ChromaU),
            2 => Ok(Channel::ChromaV),
            _ => Err(PixelwireError::InvalidChannel { bits }),
        }
    }

    /// The two-bit wire encoding of this channel.
    pub fn bits(self) -> u8 {
        match self {
            Channel::Luma => 0,
            Channel::ChromaU => 1,
            Channel::ChromaV => 2,
        }
    }

    /// Plane index used for buffer storage.
    pub fn index(self) -> usize {
        self.bits() as usize
    }
}

/// A decoded run: fill `length` pixels of one plane row with `value`.
///
/// This is the unit of work the protocol transmits. The sensor sends
/// sparse updates, so a frame is the accumulation of many runs on top
/// of the previous frame's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRun {
    /// Target plane.
    pub channel: Channel,
    /// Plane-relative row.
    pub row: u16,
    /// First column of the run.
    pub start_col: u16,
    /// Number of pixels to fill (12-bit on the wire, `0..=4095`).
    pub length: u16,
    /// Fill value, used verbatim.
    pub value: u8,
}

/// Unpacked sub-fields of the `MISC` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiscFields {
    /// Low bit of the column coordinate.
    pub x_lsb: u8,
    /// Low bit of the row coordinate.
    pub y_lsb: u8,
    /// Two-bit channel selector.
    pub channel_bits: u8,
    /// High four bits of the run length.
    pub amount_msbs: u8,
}

/// Split a `MISC` byte into its sub-fields.
pub fn unpack_misc(byte: u8) -> MiscFields {
    MiscFields {
        x_lsb: (byte >> 7) & 0b1,
        y_lsb: (byte >> 6) & 0b1,
        channel_bits: (byte >> 4) & 0b11,
        amount_msbs: byte & 0b1111,
    }
}

/// Pack sub-fields back into a `MISC` byte.
///
/// Inverse of [`unpack_misc`] for in-range inputs; out-of-range bits
/// are masked off rather than rejected.
pub fn pack_misc(fields: &MiscFields) -> u8 {
    ((fields.x_lsb & 0b1) << 7)
        | ((fields.y_lsb & 0b1) << 6)
        | ((fields.channel_bits & 0b11) << 4)
        | (fields.amount_msbs & 0b1111)
}

/// Reconstruct a [`PixelRun`] from the five payload bytes of a packet.
///
/// Coordinate and length halves are recombined per the wire layout:
/// `row = (Y_MSB << 1) | y_lsb`, `start_col = (X_MSB << 1) | x_lsb`,
/// `length = (amount_msbs << 8) | AMOUNT_LSB`.
///
/// # Errors
///
/// Returns [`PixelwireError::InvalidChannel`] when the channel bits are
/// `0b11`. Bounds against the plane geometry are not checked here; that
/// is the frame store's concern.
pub fn assemble_run(y_msb: u8, x_msb: u8, misc: u8, value: u8, amount_lsb: u8) -> Result<PixelRun> {
    let fields = unpack_misc(misc);
    let channel = Channel::from_bits(fields.channel_bits)?;
    Ok(PixelRun {
        channel,
        row: ((y_msb as u16) << 1) | fields.y_lsb as u16,
        start_col: ((x_msb as u16) << 1) | fields.x_lsb as u16,
        length: ((fields.amount_msbs as u16) << 8) | amount_lsb as u16,
        value,
    })
}

/// Encode a run into the six-byte wire form under the given id.
///
/// # Errors
///
/// Returns [`PixelwireError::Encode`] when the id is the frame-end
/// sentinel or a field exceeds its encodable range (9-bit coordinates,
/// 12-bit length).
pub fn encode_run(id: u8, run: &PixelRun) -> Result<[u8; PACKET_LEN]> {
    if id == FRAME_END {
        return Err(PixelwireError::encode_error("id 255 is the frame-end sentinel"));
    }
    if run.row > 0x1FF || run.start_col > 0x1FF {
        return Err(PixelwireError::encode_error(format!(
            "coordinate ({}, {}) exceeds 9-bit range",
            run.row, run.start_col
        )));
    }
    if run.length > 0xFFF {
        return Err(PixelwireError::encode_error(format!(
            "run length {} exceeds 12-bit range",
            run.length
        )));
    }
    let misc = pack_misc(&MiscFields {
        x_lsb: (run.start_col & 0b1) as u8,
        y_lsb: (run.row & 0b1) as u8,
        channel_bits: run.channel.bits(),
        amount_msbs: (run.length >> 8) as u8,
    });
    Ok([
        id,
        (run.row >> 1) as u8,
        (run.start_col >> 1) as u8,
        misc,
        run.value,
        (run.length & 0xFF) as u8,
    ])
}
