//! Telemetry variable types
//!
//! Variables are owned by the application and registered with the
//! [`Telemetry`](crate::telemetry::server::Telemetry) coordinator by
//! shared reference, so their state lives in atomic cells: the
//! application (possibly an interrupt handler) writes values while the
//! coordinator snapshots them during `do_io`. The dirty-flag handoff is
//! the synchronization point: a value store is `Relaxed`, the flag set
//! is `Release`, and the coordinator's read-and-clear `swap` is the
//! acquire side. Every cell is a single machine word, so no critical
//! section is needed.

use crate::platform::TelemetryHal;
use crate::protocol::packet::{FixedLengthTransmitPacket, ReceivePacketBuffer};
use crate::protocol::{
    DATATYPE_NUMERIC, DATATYPE_NUMERIC_ARRAY, NUMERIC_SUBTYPE_FLOAT, NUMERIC_SUBTYPE_SINT,
    NUMERIC_SUBTYPE_UINT, RECORDID_ARRAY_COUNT, RECORDID_DISPLAY_NAME, RECORDID_INTERNAL_NAME,
    RECORDID_NUMERIC_LENGTH, RECORDID_NUMERIC_LIMITS, RECORDID_NUMERIC_SUBTYPE, RECORDID_UNITS,
};
use core::sync::atomic::{
    AtomicBool, AtomicI16, AtomicI32, AtomicI8, AtomicU16, AtomicU32, AtomicU8, Ordering,
};

/// A numeric primitive a telemetry variable can carry.
///
/// Implemented for `u8`, `u16`, `u32`, `i8`, `i16`, `i32`, and `f32`.
/// Ties together the wire subtype tag, the wire size, the atomic cell
/// backing a value of this type, and big-endian wire I/O.
pub trait Element: Copy {
    /// Wire subtype tag (UINT / SINT / FLOAT).
    const SUBTYPE: u8;

    /// Size in bytes of one element on the wire.
    const WIRE_SIZE: usize;

    /// Lock-free backing store for one value.
    type Atomic: Send + Sync;

    fn new_atomic(value: Self) -> Self::Atomic;
    fn load(cell: &Self::Atomic) -> Self;
    fn store(cell: &Self::Atomic, value: Self);

    /// Serialize one value into an open transmit packet.
    fn write_to<H: TelemetryHal>(self, packet: &mut FixedLengthTransmitPacket<'_, H>);

    /// Deserialize one value from a received packet.
    fn read_from<H: TelemetryHal>(buffer: &mut ReceivePacketBuffer, hal: &mut H) -> Self;
}

macro_rules! impl_int_element {
    ($ty:ty, $atomic:ty, $subtype:expr, $wire:ty, $write:ident, $read:ident) => {
        impl Element for $ty {
            const SUBTYPE: u8 = $subtype;
            const WIRE_SIZE: usize = core::mem::size_of::<$ty>();

            type Atomic = $atomic;

            fn new_atomic(value: Self) -> Self::Atomic {
                <$atomic>::new(value)
            }

            fn load(cell: &Self::Atomic) -> Self {
                cell.load(Ordering::Relaxed)
            }

            fn store(cell: &Self::Atomic, value: Self) {
                cell.store(value, Ordering::Relaxed)
            }

            fn write_to<H: TelemetryHal>(self, packet: &mut FixedLengthTransmitPacket<'_, H>) {
                packet.$write(self as $wire);
            }

            fn read_from<H: TelemetryHal>(buffer: &mut ReceivePacketBuffer, hal: &mut H) -> Self {
                buffer.$read(hal) as $ty
            }
        }
    };
}

impl_int_element!(u8, AtomicU8, NUMERIC_SUBTYPE_UINT, u8, write_u8, read_u8);
impl_int_element!(u16, AtomicU16, NUMERIC_SUBTYPE_UINT, u16, write_u16, read_u16);
impl_int_element!(u32, AtomicU32, NUMERIC_SUBTYPE_UINT, u32, write_u32, read_u32);
impl_int_element!(i8, AtomicI8, NUMERIC_SUBTYPE_SINT, u8, write_u8, read_u8);
impl_int_element!(i16, AtomicI16, NUMERIC_SUBTYPE_SINT, u16, write_u16, read_u16);
impl_int_element!(i32, AtomicI32, NUMERIC_SUBTYPE_SINT, u32, write_u32, read_u32);

impl Element for f32 {
    const SUBTYPE: u8 = NUMERIC_SUBTYPE_FLOAT;
    const WIRE_SIZE: usize = 4;

    // Stored as raw IEEE-754 bits.
    type Atomic = AtomicU32;

    fn new_atomic(value: Self) -> Self::Atomic {
        AtomicU32::new(value.to_bits())
    }

    fn load(cell: &Self::Atomic) -> Self {
        f32::from_bits(cell.load(Ordering::Relaxed))
    }

    fn store(cell: &Self::Atomic, value: Self) {
        cell.store(value.to_bits(), Ordering::Relaxed)
    }

    fn write_to<H: TelemetryHal>(self, packet: &mut FixedLengthTransmitPacket<'_, H>) {
        packet.write_f32(self);
    }

    fn read_from<H: TelemetryHal>(buffer: &mut ReceivePacketBuffer, hal: &mut H) -> Self {
        buffer.read_f32(hal)
    }
}

/// The three name records every variable carries in the schema header.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    internal_name: &'static str,
    display_name: &'static str,
    units: &'static str,
}

impl Descriptor {
    pub const fn new(
        internal_name: &'static str,
        display_name: &'static str,
        units: &'static str,
    ) -> Self {
        Self {
            internal_name,
            display_name,
            units,
        }
    }

    /// Length of the name KVRs in bytes: record id + string + NUL each.
    fn header_kvrs_length(&self) -> usize {
        (1 + self.internal_name.len() + 1)
            + (1 + self.display_name.len() + 1)
            + (1 + self.units.len() + 1)
    }

    fn write_header_kvrs<H: TelemetryHal>(&self, packet: &mut FixedLengthTransmitPacket<'_, H>) {
        packet.write_u8(RECORDID_INTERNAL_NAME);
        packet.write_str(self.internal_name);
        packet.write_u8(RECORDID_DISPLAY_NAME);
        packet.write_str(self.display_name);
        packet.write_u8(RECORDID_UNITS);
        packet.write_str(self.units);
    }
}

/// Capability set the registry dispatches a variable through.
///
/// Object-safe so heterogeneous variables can sit in one fixed array;
/// the only implementations are [`Numeric`] and [`NumericArray`].
pub trait TelemetryData<H: TelemetryHal> {
    /// Wire data-type tag.
    fn data_type(&self) -> u8;

    /// Length of the header KVRs, excluding the terminator record.
    fn header_kvrs_length(&self) -> usize;

    /// Write the header KVRs, excluding the terminator record.
    fn write_header_kvrs(&self, packet: &mut FixedLengthTransmitPacket<'_, H>);

    /// Length of the value payload in a data packet.
    fn payload_length(&self) -> usize;

    /// Write the value payload.
    fn write_payload(&self, packet: &mut FixedLengthTransmitPacket<'_, H>);

    /// Overwrite the value from a received packet, interpreting the
    /// current read position as this variable's type, and raise the
    /// dirty flag.
    fn set_from_packet(&self, buffer: &mut ReceivePacketBuffer, hal: &mut H);

    /// Raise the dirty flag.
    fn mark_updated(&self);

    /// Snapshot and clear the dirty flag in one atomic step.
    fn take_updated(&self) -> bool;
}

/// A scalar telemetry variable.
///
/// ```
/// use picolink::telemetry::data::Numeric;
///
/// let speed = Numeric::new("spd", "Speed", "m/s", 0u16).with_limits(0, 400);
/// speed.set(123);
/// assert_eq!(speed.get(), 123);
/// ```
pub struct Numeric<T: Element> {
    descriptor: Descriptor,
    value: T::Atomic,
    override_value: T::Atomic,
    override_active: AtomicBool,
    updated: AtomicBool,
    min_val: T,
    max_val: T,
}

impl<T: Element> Numeric<T> {
    pub fn new(
        internal_name: &'static str,
        display_name: &'static str,
        units: &'static str,
        init_value: T,
    ) -> Self {
        Self {
            descriptor: Descriptor::new(internal_name, display_name, units),
            value: T::new_atomic(init_value),
            override_value: T::new_atomic(init_value),
            override_active: AtomicBool::new(false),
            updated: AtomicBool::new(false),
            min_val: init_value,
            max_val: init_value,
        }
    }

    /// Set the advisory limits emitted to the host. Not enforced.
    pub fn with_limits(mut self, min: T, max: T) -> Self {
        self.min_val = min;
        self.max_val = max;
        self
    }

    /// Current value as seen by the application; returns the override
    /// while one is active.
    pub fn get(&self) -> T {
        if self.override_active.load(Ordering::Acquire) {
            T::load(&self.override_value)
        } else {
            T::load(&self.value)
        }
    }

    /// Last raw value written, ignoring any override.
    pub fn raw(&self) -> T {
        T::load(&self.value)
    }

    /// Write a new value and raise the dirty flag.
    pub fn set(&self, value: T) {
        T::store(&self.value, value);
        self.updated.store(true, Ordering::Release);
    }

    /// Make [`get`](Numeric::get) return `value` until
    /// [`clear_override`](Numeric::clear_override). Raw writes and
    /// dirty tracking continue against the underlying value.
    pub fn set_override(&self, value: T) {
        T::store(&self.override_value, value);
        self.override_active.store(true, Ordering::Release);
    }

    pub fn clear_override(&self) {
        self.override_active.store(false, Ordering::Release);
    }

    pub fn override_active(&self) -> bool {
        self.override_active.load(Ordering::Acquire)
    }
}

impl<T: Element, H: TelemetryHal> TelemetryData<H> for Numeric<T> {
    fn data_type(&self) -> u8 {
        DATATYPE_NUMERIC
    }

    fn header_kvrs_length(&self) -> usize {
        self.descriptor.header_kvrs_length()
            + 2 // subtype
            + 2 // element length
            + 1 + 2 * T::WIRE_SIZE // limits
    }

    fn write_header_kvrs(&self, packet: &mut FixedLengthTransmitPacket<'_, H>) {
        self.descriptor.write_header_kvrs(packet);
        packet.write_u8(RECORDID_NUMERIC_SUBTYPE);
        packet.write_u8(T::SUBTYPE);
        packet.write_u8(RECORDID_NUMERIC_LENGTH);
        packet.write_u8(T::WIRE_SIZE as u8);
        packet.write_u8(RECORDID_NUMERIC_LIMITS);
        self.min_val.write_to(packet);
        self.max_val.write_to(packet);
    }

    fn payload_length(&self) -> usize {
        T::WIRE_SIZE
    }

    fn write_payload(&self, packet: &mut FixedLengthTransmitPacket<'_, H>) {
        T::load(&self.value).write_to(packet);
    }

    fn set_from_packet(&self, buffer: &mut ReceivePacketBuffer, hal: &mut H) {
        let value = T::read_from(buffer, hal);
        T::store(&self.value, value);
        self.updated.store(true, Ordering::Release);
    }

    fn mark_updated(&self) {
        self.updated.store(true, Ordering::Release);
    }

    fn take_updated(&self) -> bool {
        self.updated.swap(false, Ordering::AcqRel)
    }
}

/// A fixed-length array telemetry variable.
///
/// Elements are serialized contiguously in index order; one dirty flag
/// covers the whole array.
pub struct NumericArray<T: Element, const LEN: usize> {
    descriptor: Descriptor,
    value: [T::Atomic; LEN],
    updated: AtomicBool,
    min_val: T,
    max_val: T,
}

impl<T: Element, const LEN: usize> NumericArray<T, LEN> {
    pub fn new(
        internal_name: &'static str,
        display_name: &'static str,
        units: &'static str,
        elem_init_value: T,
    ) -> Self {
        Self {
            descriptor: Descriptor::new(internal_name, display_name, units),
            value: core::array::from_fn(|_| T::new_atomic(elem_init_value)),
            updated: AtomicBool::new(false),
            min_val: elem_init_value,
            max_val: elem_init_value,
        }
    }

    /// Set the advisory per-element limits emitted to the host.
    pub fn with_limits(mut self, min: T, max: T) -> Self {
        self.min_val = min;
        self.max_val = max;
        self
    }

    /// Element count.
    pub const fn len(&self) -> usize {
        LEN
    }

    pub const fn is_empty(&self) -> bool {
        LEN == 0
    }

    /// Read one element. Panics if `index >= LEN`.
    pub fn get(&self, index: usize) -> T {
        T::load(&self.value[index])
    }

    /// Write one element and raise the dirty flag. Panics if
    /// `index >= LEN`.
    pub fn set(&self, index: usize, value: T) {
        T::store(&self.value[index], value);
        self.updated.store(true, Ordering::Release);
    }
}

impl<T: Element, H: TelemetryHal, const LEN: usize> TelemetryData<H> for NumericArray<T, LEN> {
    fn data_type(&self) -> u8 {
        DATATYPE_NUMERIC_ARRAY
    }

    fn header_kvrs_length(&self) -> usize {
        self.descriptor.header_kvrs_length()
            + 2 // subtype
            + 2 // element length
            + 1 + 4 // array count
            + 1 + 2 * T::WIRE_SIZE // limits
    }

    fn write_header_kvrs(&self, packet: &mut FixedLengthTransmitPacket<'_, H>) {
        self.descriptor.write_header_kvrs(packet);
        packet.write_u8(RECORDID_NUMERIC_SUBTYPE);
        packet.write_u8(T::SUBTYPE);
        packet.write_u8(RECORDID_NUMERIC_LENGTH);
        packet.write_u8(T::WIRE_SIZE as u8);
        packet.write_u8(RECORDID_ARRAY_COUNT);
        packet.write_u32(LEN as u32);
        packet.write_u8(RECORDID_NUMERIC_LIMITS);
        self.min_val.write_to(packet);
        self.max_val.write_to(packet);
    }

    fn payload_length(&self) -> usize {
        LEN * T::WIRE_SIZE
    }

    fn write_payload(&self, packet: &mut FixedLengthTransmitPacket<'_, H>) {
        for cell in &self.value {
            T::load(cell).write_to(packet);
        }
    }

    fn set_from_packet(&self, buffer: &mut ReceivePacketBuffer, hal: &mut H) {
        for cell in &self.value {
            let value = T::read_from(buffer, hal);
            T::store(cell, value);
        }
        self.updated.store(true, Ordering::Release);
    }

    fn mark_updated(&self) {
        self.updated.store(true, Ordering::Release);
    }

    fn take_updated(&self) -> bool {
        self.updated.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockHal;

    // Writes every KVR through a packet whose declared length is the
    // reported KVR length; any mismatch trips the codec's accounting.
    fn check_kvr_accounting<H, D>(hal: &mut H, data: &D)
    where
        H: TelemetryHal,
        D: TelemetryData<H>,
    {
        let length = data.header_kvrs_length();
        let mut packet = FixedLengthTransmitPacket::new(hal, length);
        data.write_header_kvrs(&mut packet);
        packet.finish();
    }

    #[test]
    fn test_scalar_set_get() {
        let var = Numeric::new("rpm", "Engine RPM", "1/min", 0u32);
        assert_eq!(var.get(), 0);
        var.set(6800);
        assert_eq!(var.get(), 6800);
        assert_eq!(var.raw(), 6800);
    }

    #[test]
    fn test_scalar_dirty_tracking() {
        let var = Numeric::new("t", "T", "", 0i16);
        assert!(!TelemetryData::<MockHal>::take_updated(&var));

        var.set(-40);
        assert!(TelemetryData::<MockHal>::take_updated(&var));
        // Snapshot-and-clear: the flag is gone until the next write.
        assert!(!TelemetryData::<MockHal>::take_updated(&var));
    }

    #[test]
    fn test_override_masks_reads_not_payload() {
        let mut hal = MockHal::new();
        let var = Numeric::new("v", "V", "mV", 100u16);

        var.set_override(999);
        var.set(150);

        // Application reads see the override...
        assert_eq!(var.get(), 999);
        assert!(var.override_active());
        // ...while the reported value stays the raw one.
        assert_eq!(var.raw(), 150);
        let mut packet = FixedLengthTransmitPacket::new(&mut hal, 2);
        TelemetryData::write_payload(&var, &mut packet);
        packet.finish();
        assert_eq!(&hal.tx_data()[4..], &[0x00, 0x96]);

        var.clear_override();
        assert_eq!(var.get(), 150);
    }

    #[test]
    fn test_scalar_header_kvrs() {
        let mut hal = MockHal::new();
        let var = Numeric::new("a", "A", "", 0u16).with_limits(0, 100);
        check_kvr_accounting(&mut hal, &var);

        assert!(hal.errors().is_empty());
        assert_eq!(
            &hal.tx_data()[4..],
            &[
                0x01, b'a', 0x00, // internal name
                0x02, b'A', 0x00, // display name
                0x03, 0x00, // units (empty)
                0x40, 0x01, // subtype: uint
                0x41, 0x02, // element length
                0x42, 0x00, 0x00, 0x00, 0x64, // limits 0..100
            ]
        );
    }

    #[test]
    fn test_float_header_subtype() {
        let mut hal = MockHal::new();
        let var = Numeric::new("x", "X", "", 0.0f32).with_limits(-1.0, 1.0);
        check_kvr_accounting(&mut hal, &var);

        assert!(hal.errors().is_empty());
        let tx = hal.tx_data();
        // subtype FLOAT, element length 4
        assert_eq!(&tx[12..16], &[0x40, 0x03, 0x41, 0x04]);
        // limits: -1.0 then 1.0, big-endian IEEE-754
        assert_eq!(
            &tx[16..25],
            &[0x42, 0xBF, 0x80, 0x00, 0x00, 0x3F, 0x80, 0x00, 0x00]
        );
    }

    #[test]
    fn test_scalar_ingress_apply() {
        let mut hal = MockHal::new();
        let var = Numeric::new("n", "N", "", 0u16);
        let mut buffer = ReceivePacketBuffer::new();
        buffer.add_byte(0x00, &mut hal);
        buffer.add_byte(0x2A, &mut hal);

        TelemetryData::set_from_packet(&var, &mut buffer, &mut hal);
        assert_eq!(var.get(), 0x002A);
        assert!(TelemetryData::<MockHal>::take_updated(&var));
    }

    #[test]
    fn test_signed_element_round_trip() {
        let mut hal = MockHal::new();
        let var = Numeric::new("s", "S", "", 0i32);
        let mut packet = FixedLengthTransmitPacket::new(&mut hal, 4);
        var.set(-2);
        TelemetryData::write_payload(&var, &mut packet);
        packet.finish();
        assert_eq!(&hal.tx_data()[4..], &[0xFF, 0xFF, 0xFF, 0xFE]);

        let mut buffer = ReceivePacketBuffer::new();
        for byte in [0xFF, 0xFF, 0xFF, 0xFE] {
            buffer.add_byte(byte, &mut hal);
        }
        let other = Numeric::new("o", "O", "", 0i32);
        TelemetryData::set_from_packet(&other, &mut buffer, &mut hal);
        assert_eq!(other.get(), -2);
    }

    #[test]
    fn test_array_elements_contiguous() {
        let mut hal = MockHal::new();
        let arr: NumericArray<u16, 3> = NumericArray::new("w", "W", "", 0);
        arr.set(0, 0x0102);
        arr.set(1, 0x0304);
        arr.set(2, 0x0506);

        assert_eq!(TelemetryData::<MockHal>::payload_length(&arr), 6);
        let mut packet = FixedLengthTransmitPacket::new(&mut hal, 6);
        TelemetryData::write_payload(&arr, &mut packet);
        packet.finish();
        // Index order, big-endian; the 0x05 picks up a stuff byte.
        assert_eq!(
            &hal.tx_data()[4..],
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x00, 0x06]
        );
    }

    #[test]
    fn test_array_header_kvrs() {
        let mut hal = MockHal::new();
        let arr: NumericArray<u8, 4> = NumericArray::new("rgb", "Leds", "", 0).with_limits(0, 255);
        check_kvr_accounting(&mut hal, &arr);

        assert!(hal.errors().is_empty());
        assert_eq!(
            &hal.tx_data()[4..],
            &[
                0x01, b'r', b'g', b'b', 0x00, // internal name
                0x02, b'L', b'e', b'd', b's', 0x00, // display name
                0x03, 0x00, // units
                0x40, 0x01, // subtype: uint
                0x41, 0x01, // element length
                0x50, 0x00, 0x00, 0x00, 0x04, // array count
                0x42, 0x00, 0xFF, // limits
            ]
        );
    }

    #[test]
    fn test_array_ingress_apply() {
        let mut hal = MockHal::new();
        let arr: NumericArray<i8, 3> = NumericArray::new("g", "G", "", 0);
        let mut buffer = ReceivePacketBuffer::new();
        for byte in [0x01, 0xFF, 0x7F] {
            buffer.add_byte(byte, &mut hal);
        }

        TelemetryData::set_from_packet(&arr, &mut buffer, &mut hal);
        assert_eq!(arr.get(0), 1);
        assert_eq!(arr.get(1), -1);
        assert_eq!(arr.get(2), 127);
        assert!(TelemetryData::<MockHal>::take_updated(&arr));
    }
}
