//! Telemetry server
//!
//! Owns the framing decoder, the receive buffer, and the pass-through
//! queue; borrows the registered variables. `do_io` is the single entry
//! point for the periodic task: it emits one data packet covering every
//! variable marked dirty since the last tick, then drains the receive
//! stream through the framing decoder.
//!
//! All errors are non-fatal and reported through the HAL error sink;
//! the offending byte, field, or packet is dropped and the stream keeps
//! running.

use crate::core::queue::SpscQueue;
use crate::log_debug;
use crate::platform::TelemetryHal;
use crate::protocol::decoder::{FeedResult, FrameDecoder};
use crate::protocol::packet::{FixedLengthTransmitPacket, ReceivePacketBuffer};
use crate::protocol::{DATAID_TERMINATOR, OPCODE_DATA, OPCODE_HEADER, RECORDID_TERMINATOR};
use crate::telemetry::data::TelemetryData;

/// Maximum number of variables one server can hold.
pub const DATA_LIMIT: usize = 16;

/// Capacity of the pass-through byte queue.
pub const SERIAL_RX_BUFFER_SIZE: usize = 256;

// One spare slot so the queue's full and empty states stay distinct.
const RX_QUEUE_SLOTS: usize = SERIAL_RX_BUFFER_SIZE + 1;

/// Telemetry server object.
///
/// Generic over the HAL; pass `&mut hal` to borrow one owned by the
/// application, or move a HAL in. Registered variables are borrowed and
/// must outlive the server.
///
/// # Example
///
/// ```ignore
/// use picolink::platform::mock::MockHal;
/// use picolink::telemetry::{Numeric, Telemetry};
///
/// let speed = Numeric::new("spd", "Speed", "m/s", 0u16).with_limits(0, 400);
/// let mut telemetry = Telemetry::new(MockHal::new());
///
/// let id = telemetry.add_data(&speed);
/// assert_eq!(id, 1);
/// telemetry.transmit_header();
///
/// speed.set(88);
/// telemetry.do_io(); // emits a data packet carrying `speed`
/// ```
pub struct Telemetry<'a, H: TelemetryHal> {
    hal: H,
    /// Registered variables; index + 1 is the wire data id.
    data: [Option<&'a dyn TelemetryData<H>>; DATA_LIMIT],
    data_count: usize,
    /// Buffer holding the receive packet being assembled / parsed.
    received_packet: ReceivePacketBuffer,
    decoder: FrameDecoder,
    /// Received non-telemetry data, decoder producer / application
    /// consumer.
    rx_queue: SpscQueue<u8, RX_QUEUE_SLOTS>,
    header_transmitted: bool,
    /// Sequence number of the next packet to be transmitted.
    tx_sequence: u8,
}

impl<'a, H: TelemetryHal> Telemetry<'a, H> {
    pub fn new(hal: H) -> Self {
        Self {
            hal,
            data: [None; DATA_LIMIT],
            data_count: 0,
            received_packet: ReceivePacketBuffer::new(),
            decoder: FrameDecoder::new(),
            rx_queue: SpscQueue::new(),
            header_transmitted: false,
            tx_sequence: 0,
        }
    }

    /// Access the HAL (test verification, direct stream writes).
    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Register a variable, returning its data id in `[1, DATA_LIMIT]`.
    ///
    /// Returns 0 after reporting an error if the registry is full or
    /// the header has already been transmitted. The variable starts
    /// dirty so the first data packet carries its initial value.
    pub fn add_data(&mut self, new_data: &'a dyn TelemetryData<H>) -> usize {
        if self.data_count >= DATA_LIMIT {
            self.hal.do_error("Data limit reached");
            return 0;
        }
        if self.header_transmitted {
            self.hal.do_error("Cannot add data after header");
            return 0;
        }
        self.data[self.data_count] = Some(new_data);
        new_data.mark_updated();
        self.data_count += 1;
        log_debug!("registered data id {}", self.data_count);
        self.data_count
    }

    /// Mark a data id as updated, to be carried in the next packet.
    ///
    /// Ids outside `[1, data_count]` are ignored.
    pub fn mark_data_updated(&self, data_id: usize) {
        if data_id >= 1 && data_id <= self.data_count {
            if let Some(entry) = self.data[data_id - 1] {
                entry.mark_updated();
            }
        }
    }

    /// Transmit the schema header.
    ///
    /// Must be called after all `add_data` calls and before any I/O.
    /// Registration is frozen afterwards; calling twice is an error.
    pub fn transmit_header(&mut self) {
        if self.header_transmitted {
            self.hal.do_error("Cannot retransmit header");
            return;
        }

        let mut packet_length = 2; // opcode + sequence
        for entry in self.data[..self.data_count].iter().flatten() {
            packet_length += 2; // data id, data type
            packet_length += entry.header_kvrs_length();
            packet_length += 1; // terminator record id
        }
        packet_length += 1; // terminator "record"

        let mut packet = FixedLengthTransmitPacket::new(&mut self.hal, packet_length);
        packet.write_u8(OPCODE_HEADER);
        packet.write_u8(self.tx_sequence);
        for data_idx in 0..self.data_count {
            let Some(entry) = self.data[data_idx] else {
                continue;
            };
            packet.write_u8((data_idx + 1) as u8);
            packet.write_u8(entry.data_type());
            entry.write_header_kvrs(&mut packet);
            packet.write_u8(RECORDID_TERMINATOR);
        }
        packet.write_u8(DATAID_TERMINATOR);
        packet.finish();

        self.tx_sequence = self.tx_sequence.wrapping_add(1);
        self.header_transmitted = true;
        log_debug!("header transmitted, {} channels", self.data_count);
    }

    /// Run one I/O tick: transmit updated data, then process received
    /// bytes. Call on a regular basis; may block in the HAL's transmit
    /// path.
    pub fn do_io(&mut self) {
        self.transmit_data();
        self.process_received_data();
    }

    /// Returns whether `read_receive` will return valid data.
    pub fn receive_available(&self) -> bool {
        !self.rx_queue.empty()
    }

    /// Next pass-through byte, or 255 when none is queued.
    pub fn read_receive(&mut self) -> u8 {
        self.rx_queue.dequeue().unwrap_or(255)
    }

    /// Transmit a data packet carrying every variable whose dirty flag
    /// is set, clearing the flags as they are snapshotted.
    ///
    /// A tick with no dirty variables still emits the empty packet, so
    /// the host sees a live link.
    fn transmit_data(&mut self) {
        if !self.header_transmitted {
            self.hal.do_error("Header not transmitted");
            return;
        }

        // Snapshot-and-clear so a concurrent update lands in this
        // packet or the next, never lost and never duplicated.
        let mut updated = [false; DATA_LIMIT];
        let mut packet_length = 2; // opcode + sequence
        for data_idx in 0..self.data_count {
            let Some(entry) = self.data[data_idx] else {
                continue;
            };
            updated[data_idx] = entry.take_updated();
            if updated[data_idx] {
                packet_length += 1; // data id
                packet_length += entry.payload_length();
            }
        }
        packet_length += 1; // terminator "record"

        let mut packet = FixedLengthTransmitPacket::new(&mut self.hal, packet_length);
        packet.write_u8(OPCODE_DATA);
        packet.write_u8(self.tx_sequence);
        for data_idx in 0..self.data_count {
            if !updated[data_idx] {
                continue;
            }
            let Some(entry) = self.data[data_idx] else {
                continue;
            };
            packet.write_u8((data_idx + 1) as u8);
            entry.write_payload(&mut packet);
        }
        packet.write_u8(DATAID_TERMINATOR);
        packet.finish();

        self.tx_sequence = self.tx_sequence.wrapping_add(1);
    }

    /// Drain the receive stream, splitting pass-through bytes from
    /// in-band frames and dispatching completed packets.
    fn process_received_data(&mut self) {
        let now = self.hal.get_time_ms();
        if self.decoder.check_timeout(now) {
            self.hal.do_error("RX timeout");
        }

        let mut received = false;
        while self.hal.rx_available() > 0 {
            received = true;
            let byte = self.hal.receive_byte();
            let result =
                self.decoder
                    .feed(byte, &mut self.received_packet, &self.rx_queue, &mut self.hal);
            if result == FeedResult::PacketReady {
                self.process_received_packet();
            }
        }
        self.decoder.finish_tick(now, received);
    }

    /// Dispatch the completed packet in `received_packet`.
    fn process_received_packet(&mut self) {
        let opcode = self.received_packet.read_u8(&mut self.hal);
        if opcode != OPCODE_DATA {
            self.hal.do_error("Unknown opcode");
            return;
        }

        loop {
            let data_id = self.received_packet.read_u8(&mut self.hal);
            if data_id == DATAID_TERMINATOR {
                break;
            }
            let data_idx = data_id as usize - 1;
            let entry = self.data[..self.data_count]
                .get(data_idx)
                .copied()
                .flatten();
            match entry {
                Some(entry) => {
                    entry.set_from_packet(&mut self.received_packet, &mut self.hal);
                }
                None => {
                    // The unknown value's width is unknowable, so the
                    // rest of the packet cannot be parsed.
                    self.hal.do_error("Unknown data ID");
                    return;
                }
            }
        }
    }
}
