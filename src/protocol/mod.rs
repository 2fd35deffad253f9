//! Wire protocol
//!
//! Frame layout on the stream, all multi-byte fields big-endian:
//!
//! ```text
//! SOF(2) = 05 39 | LENGTH(2) | PAYLOAD(LENGTH bytes, stuffed) | [CRC reserved]
//! ```
//!
//! Every payload byte equal to `SOF_SEQ[0]` is followed by one stuff
//! byte `0x00` that does not count toward LENGTH, so the SOF sequence
//! can never appear inside a payload.
//!
//! Header packet payload:
//!
//! ```text
//! 81 | SEQ | { DATA_ID | DATA_TYPE | KVRS... | 00 }* | 00
//! ```
//!
//! Data packet payload:
//!
//! ```text
//! 01 | SEQ | { DATA_ID | VALUE }* | 00
//! ```

pub mod decoder;
pub mod packet;

pub use decoder::{FeedResult, FrameDecoder};
pub use packet::{FixedLengthTransmitPacket, ReceivePacketBuffer};

/// Start-of-frame sequence.
///
/// The byte-stuffing scheme assumes exactly two SOF bytes.
pub const SOF_SEQ: [u8; 2] = [0x05, 0x39];

/// Stuff byte emitted after any payload byte equal to `SOF_SEQ[0]`.
pub const SOF_STUFF_BYTE: u8 = 0x00;

/// Size of the frame LENGTH field, in bytes.
pub const LENGTH_SIZE: usize = 2;

pub const OPCODE_HEADER: u8 = 0x81;
pub const OPCODE_DATA: u8 = 0x01;

/// Data id 0 terminates an id list on the wire; real ids start at 1.
pub const DATAID_TERMINATOR: u8 = 0x00;

pub const DATATYPE_NUMERIC: u8 = 0x01;
pub const DATATYPE_NUMERIC_ARRAY: u8 = 0x02;

pub const RECORDID_TERMINATOR: u8 = 0x00;
pub const RECORDID_INTERNAL_NAME: u8 = 0x01;
pub const RECORDID_DISPLAY_NAME: u8 = 0x02;
pub const RECORDID_UNITS: u8 = 0x03;

// Reserved for host-initiated value override. Both record ids carry the
// same value; the aliasing is unresolved and no wire path uses them yet.
pub const RECORDID_OVERRIDE_CTL: u8 = 0x08;
pub const RECORDID_OVERRIDE_DATA: u8 = 0x08;

pub const RECORDID_NUMERIC_SUBTYPE: u8 = 0x40;
pub const RECORDID_NUMERIC_LENGTH: u8 = 0x41;
pub const RECORDID_NUMERIC_LIMITS: u8 = 0x42;
pub const RECORDID_ARRAY_COUNT: u8 = 0x50;

pub const NUMERIC_SUBTYPE_UINT: u8 = 0x01;
pub const NUMERIC_SUBTYPE_SINT: u8 = 0x02;
pub const NUMERIC_SUBTYPE_FLOAT: u8 = 0x03;

/// Time after which a partially received frame is discarded.
pub const DECODER_TIMEOUT_MS: u32 = 100;

/// Maximum payload size of a received telemetry packet.
pub const MAX_RECEIVE_PACKET_LENGTH: usize = 255;
