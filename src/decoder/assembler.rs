//! Per-field packet assembly state machine.
//!
//! The wire format has no preamble and no checksum; the only corruption
//! detector available is id continuity, so the id byte is checked on
//! every packet before any payload byte is trusted. Payload fields are
//! stored verbatim until the final byte arrives, because run length and
//! channel cannot be resolved before `MISC` and `AMOUNT_LSB` are both
//! in hand.

use crate::wire::{self, FRAME_END, PixelRun};

/// The six packet fields, in wire order.
///
/// Doubles as the assembler's cursor: the variant names the field the
/// next byte will be interpreted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketField {
    Id,
    YMsb,
    XMsb,
    Misc,
    Value,
    AmountLsb,
}

impl PacketField {
    fn advance(self) -> Self {
        match self {
            PacketField::Id => PacketField::YMsb,
            PacketField::YMsb => PacketField::XMsb,
            PacketField::XMsb => PacketField::Misc,
            PacketField::Misc => PacketField::Value,
            PacketField::Value => PacketField::AmountLsb,
            // Completion resets explicitly; advancing past the last
            // field wraps to Id.
            PacketField::AmountLsb => PacketField::Id,
        }
    }
}

/// Result of offering one byte to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Byte stored; the packet needs more bytes.
    NeedMore,
    /// All six fields received and the payload decoded cleanly.
    PacketComplete(PixelRun),
    /// The one-byte frame-end sentinel was seen at the id position.
    FrameEndMarker,
    /// The id byte broke sequence continuity.
    FramingError { expected: u8, got: u8 },
    /// The payload decoded to an impossible channel.
    InvalidChannel { bits: u8 },
}

/// Scratch storage for the packet in progress.
#[derive(Debug, Default, Clone, Copy)]
struct PartialPacket {
    y_msb: u8,
    x_msb: u8,
    misc: u8,
    value: u8,
}

/// Accumulates one 6-byte packet, one byte at a time.
///
/// Also owns the expected-id counter: ids increment by one modulo
/// [`wire::SEQ_MODULO`] between data packets, and `None` (after a reset
/// or frame swap) means the next data id must be 0.
#[derive(Debug)]
pub struct PacketAssembler {
    field: PacketField,
    expected: Option<u8>,
    scratch: PartialPacket,
}

impl PacketAssembler {
    pub fn new() -> Self {
        Self { field: PacketField::Id, expected: None, scratch: PartialPacket::default() }
    }

    /// The id the next data packet must carry.
    pub fn expected_id(&self) -> u8 {
        self.expected.unwrap_or(0)
    }

    /// Reset for a fresh frame: cursor to the id field, id counter to
    /// "next must be 0".
    pub fn reset_frame(&mut self) {
        self.field = PacketField::Id;
        self.expected = None;
    }

    /// Resume assembly after resync matched `id` as a valid id byte.
    ///
    /// The id is accepted as already consumed; the next byte fed will
    /// be interpreted as `Y_MSB`.
    pub fn resume_after_id(&mut self, id: u8) {
        self.expected = Some(wire::next_id(id));
        self.field = PacketField::YMsb;
    }

    /// Consume one byte at the current field position.
    ///
    /// On [`FieldOutcome::FramingError`] the cursor stays at the id
    /// field; the caller is expected to stop feeding the assembler and
    /// enter resync. After the final field the cursor resets to the id
    /// field regardless of whether the payload decoded cleanly.
    pub fn accept(&mut self, byte: u8) -> FieldOutcome {
        match self.field {
            PacketField::Id => {
                if byte == FRAME_END {
                    // Frame end is a 1-byte marker, not a full packet.
                    return FieldOutcome::FrameEndMarker;
                }
                let expected = self.expected_id();
                if byte != expected {
                    return FieldOutcome::FramingError { expected, got: byte };
                }
                self.expected = Some(wire::next_id(byte));
                self.field = self.field.advance();
                FieldOutcome::NeedMore
            }
            PacketField::YMsb => {
                self.scratch.y_msb = byte;
                self.field = self.field.advance();
                FieldOutcome::NeedMore
            }
            PacketField::XMsb => {
                self.scratch.x_msb = byte;
                self.field = self.field.advance();
                FieldOutcome::NeedMore
            }
            PacketField::Misc => {
                self.scratch.misc = byte;
                self.field = self.field.advance();
                FieldOutcome::NeedMore
            }
            PacketField::Value => {
                self.scratch.value = byte;
                self.field = self.field.advance();
                FieldOutcome::NeedMore
            }
            PacketField::AmountLsb => {
                self.field = PacketField::Id;
                let s = self.scratch;
                match wire::assemble_run(s.y_msb, s.x_msb, s.misc, s.value, byte) {
                    Ok(run) => FieldOutcome::PacketComplete(run),
                    // The channel mapping is the codec's only partial function.
                    Err(_) => FieldOutcome::InvalidChannel {
                        bits: wire::unpack_misc(s.misc).channel_bits,
                    },
                }
            }
        }
    }
}

impl Default for PacketAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::wire::{Channel, encode_run};

    fn feed_packet(asm: &mut PacketAssembler, bytes: &[u8; 6]) -> FieldOutcome {
        let mut last = FieldOutcome::NeedMore;
        for &b in bytes {
            last = asm.accept(b);
        }
        last
    }

    #[test]
    fn first_packet_of_a_frame_must_carry_id_zero() {
        let mut asm = PacketAssembler::new();
        assert_eq!(asm.expected_id(), 0);
        assert_eq!(
            asm.accept(7),
            FieldOutcome::FramingError { expected: 0, got: 7 }
        );
    }

    #[test]
    fn full_packet_assembles_into_a_run() {
        let mut asm = PacketAssembler::new();
        let run = PixelRun {
            channel: Channel::Luma,
            row: 100,
            start_col: 33,
            length: 300,
            value: 200,
        };
        let bytes = encode_run(0, &run).unwrap();
        assert_eq!(feed_packet(&mut asm, &bytes), FieldOutcome::PacketComplete(run));
        // Sequence advanced past the consumed packet.
        assert_eq!(asm.expected_id(), 1);
    }

    #[test]
    fn sentinel_at_id_position_is_a_one_byte_marker() {
        let mut asm = PacketAssembler::new();
        assert_eq!(asm.accept(FRAME_END), FieldOutcome::FrameEndMarker);
    }

    #[test]
    fn sentinel_valued_bytes_inside_payload_are_plain_data() {
        let mut asm = PacketAssembler::new();
        // id=0, then 255 as Y_MSB: row = 255 << 1 = 510.
        for b in [0, 255, 0, 0, 9, 1] {
            match asm.accept(b) {
                FieldOutcome::NeedMore => {}
                FieldOutcome::PacketComplete(run) => {
                    assert_eq!(run.row, 510);
                    assert_eq!(run.value, 9);
                    assert_eq!(run.length, 1);
                    return;
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        panic!("packet never completed");
    }

    #[test]
    fn invalid_channel_resolves_only_at_final_field() {
        let mut asm = PacketAssembler::new();
        // channel bits 0b11 in MISC; error surfaces at AMOUNT_LSB.
        let outcomes: Vec<_> = [0u8, 0, 0, 0b0011_0000, 0, 0]
            .iter()
            .map(|&b| asm.accept(b))
            .collect();
        assert!(outcomes[..5].iter().all(|o| *o == FieldOutcome::NeedMore));
        assert_eq!(outcomes[5], FieldOutcome::InvalidChannel { bits: 3 });
        // Cursor reset: next byte is an id byte again.
        assert_eq!(
            asm.accept(99),
            FieldOutcome::FramingError { expected: 1, got: 99 }
        );
    }

    #[test]
    fn ids_advance_by_one_across_packets() {
        let mut asm = PacketAssembler::new();
        let run = PixelRun { channel: Channel::Luma, row: 0, start_col: 0, length: 1, value: 0 };
        for id in 0u8..5 {
            let bytes = encode_run(id, &run).unwrap();
            assert_eq!(feed_packet(&mut asm, &bytes), FieldOutcome::PacketComplete(run));
        }
        assert_eq!(asm.expected_id(), 5);
        assert_eq!(
            asm.accept(4),
            FieldOutcome::FramingError { expected: 5, got: 4 }
        );
    }

    #[test]
    fn resume_after_id_skips_the_id_field() {
        let mut asm = PacketAssembler::new();
        asm.resume_after_id(41);
        let run = PixelRun { channel: Channel::ChromaV, row: 10, start_col: 2, length: 4, value: 1 };
        let bytes = encode_run(41, &run).unwrap();
        // Feed payload only; the id was consumed by resync.
        let mut last = FieldOutcome::NeedMore;
        for &b in &bytes[1..] {
            last = asm.accept(b);
        }
        assert_eq!(last, FieldOutcome::PacketComplete(run));
        assert_eq!(asm.expected_id(), 42);
    }

    #[test]
    fn reset_frame_rewinds_the_sequence_to_zero() {
        let mut asm = PacketAssembler::new();
        let run = PixelRun { channel: Channel::Luma, row: 0, start_col: 0, length: 1, value: 0 };
        feed_packet(&mut asm, &encode_run(0, &run).unwrap());
        asm.reset_frame();
        assert_eq!(asm.expected_id(), 0);
        assert_eq!(feed_packet(&mut asm, &encode_run(0, &run).unwrap()),
            FieldOutcome::PacketComplete(run));
    }
}
