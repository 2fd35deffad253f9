//! Packet encode/decode primitives
//!
//! [`FixedLengthTransmitPacket`] streams a frame of known payload length
//! straight to the HAL with byte stuffing applied on the way out; there
//! is no transmit-side buffering. [`ReceivePacketBuffer`] is the linear
//! store the framing decoder assembles a destuffed payload into, with
//! bounds-checked big-endian reads for dispatch.

use crate::platform::TelemetryHal;
use crate::protocol::{MAX_RECEIVE_PACKET_LENGTH, SOF_SEQ, SOF_STUFF_BYTE};
use heapless::Vec;

/// A telemetry frame with a payload length declared up front.
///
/// Construction emits the SOF sequence and the big-endian length;
/// writes stream payload bytes directly to the HAL. A write past the
/// declared length is reported and dropped; [`finish`] reports a
/// payload that came up short. A CRC field is reserved after the
/// payload but not currently emitted.
///
/// [`finish`]: FixedLengthTransmitPacket::finish
pub struct FixedLengthTransmitPacket<'a, H: TelemetryHal> {
    hal: &'a mut H,
    /// Declared payload length in bytes, for the length accounting.
    length: usize,
    /// Payload bytes written so far. Stuff bytes are not counted.
    count: usize,
}

impl<'a, H: TelemetryHal> FixedLengthTransmitPacket<'a, H> {
    /// Open a frame of `length` payload bytes.
    pub fn new(hal: &'a mut H, length: usize) -> Self {
        for &byte in SOF_SEQ.iter() {
            hal.transmit_byte(byte);
        }
        hal.transmit_byte((length >> 8) as u8);
        hal.transmit_byte(length as u8);

        Self {
            hal,
            length,
            count: 0,
        }
    }

    /// Write one payload byte, stuffing if it matches `SOF_SEQ[0]`.
    ///
    /// The stuffing scheme covers only the first SOF byte; it is sound
    /// solely for a two-byte SOF sequence.
    pub fn write_byte(&mut self, byte: u8) {
        if self.count + 1 > self.length {
            self.hal.do_error("TX packet over length");
            return;
        }
        self.hal.transmit_byte(byte);
        if byte == SOF_SEQ[0] {
            self.hal.transmit_byte(SOF_STUFF_BYTE);
        }
        self.count += 1;
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_byte(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte);
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte);
        }
    }

    /// Write a float as its IEEE-754 bits, big-endian.
    ///
    /// Wire order is fixed regardless of host endianness.
    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    /// Write an ASCII string followed by its NUL terminator.
    pub fn write_str(&mut self, value: &str) {
        for byte in value.bytes() {
            self.write_byte(byte);
        }
        self.write_byte(0);
    }

    /// Close the frame, verifying the length accounting.
    pub fn finish(mut self) {
        if self.count != self.length {
            self.hal.do_error("TX packet under length");
        }
    }
}

/// Buffer holding the receive packet being assembled, then parsed.
///
/// Reads advance a cursor and are checked against the stored payload
/// length; a read past the end reports through the HAL error sink and
/// returns zero, which doubles as the wire list terminator so dispatch
/// loops end cleanly on truncated packets.
pub struct ReceivePacketBuffer {
    data: Vec<u8, MAX_RECEIVE_PACKET_LENGTH>,
    read_loc: usize,
}

impl ReceivePacketBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            read_loc: 0,
        }
    }

    /// Start a new packet, resetting the payload and read cursor.
    pub fn new_packet(&mut self) {
        self.data.clear();
        self.read_loc = 0;
    }

    /// Bytes accumulated for the current packet.
    pub fn packet_length(&self) -> usize {
        self.data.len()
    }

    /// Append one payload byte. Overflow is reported and dropped.
    pub fn add_byte<H: TelemetryHal>(&mut self, byte: u8, hal: &mut H) {
        if self.data.push(byte).is_err() {
            hal.do_error("RX packet over length");
        }
    }

    pub fn read_u8<H: TelemetryHal>(&mut self, hal: &mut H) -> u8 {
        if self.read_loc + 1 > self.data.len() {
            hal.do_error("Read u8 over length");
            return 0;
        }
        let value = self.data[self.read_loc];
        self.read_loc += 1;
        value
    }

    pub fn read_u16<H: TelemetryHal>(&mut self, hal: &mut H) -> u16 {
        if self.read_loc + 2 > self.data.len() {
            hal.do_error("Read u16 over length");
            return 0;
        }
        let value = u16::from_be_bytes([self.data[self.read_loc], self.data[self.read_loc + 1]]);
        self.read_loc += 2;
        value
    }

    pub fn read_u32<H: TelemetryHal>(&mut self, hal: &mut H) -> u32 {
        if self.read_loc + 4 > self.data.len() {
            hal.do_error("Read u32 over length");
            return 0;
        }
        let value = u32::from_be_bytes([
            self.data[self.read_loc],
            self.data[self.read_loc + 1],
            self.data[self.read_loc + 2],
            self.data[self.read_loc + 3],
        ]);
        self.read_loc += 4;
        value
    }

    pub fn read_f32<H: TelemetryHal>(&mut self, hal: &mut H) -> f32 {
        if self.read_loc + 4 > self.data.len() {
            hal.do_error("Read f32 over length");
            return 0.0;
        }
        let bits = u32::from_be_bytes([
            self.data[self.read_loc],
            self.data[self.read_loc + 1],
            self.data[self.read_loc + 2],
            self.data[self.read_loc + 3],
        ]);
        self.read_loc += 4;
        f32::from_bits(bits)
    }
}

impl Default for ReceivePacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}
