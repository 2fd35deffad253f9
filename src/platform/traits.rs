//! Hardware abstraction trait for the telemetry server

/// Byte-stream hardware abstraction.
///
/// One implementation per transport (UART, USB CDC, ...). All telemetry
/// I/O and diagnostics flow through this trait; the server itself never
/// touches a peripheral register.
///
/// Errors raised by the server are non-fatal and delivered to
/// [`do_error`](TelemetryHal::do_error); no operation returns a
/// `Result`. Implementations may log, count, or ignore them.
pub trait TelemetryHal {
    /// Write one byte to the transmit stream.
    ///
    /// May block if the downstream transmit buffer is full and the
    /// platform's TX path is synchronous.
    fn transmit_byte(&mut self, byte: u8);

    /// Number of bytes ready to read from the receive stream.
    fn rx_available(&self) -> usize;

    /// Remove and return the next received byte.
    ///
    /// Callers must have observed `rx_available() > 0`.
    fn receive_byte(&mut self) -> u8;

    /// Non-fatal diagnostic sink. Messages are fixed ASCII literals.
    fn do_error(&mut self, message: &str);

    /// Current time in milliseconds. Monotonic, may wrap at any point.
    fn get_time_ms(&self) -> u32;
}

// Lets the coordinator either own its HAL or borrow one the application
// keeps (`Telemetry::new(&mut hal)`).
impl<T: TelemetryHal + ?Sized> TelemetryHal for &mut T {
    fn transmit_byte(&mut self, byte: u8) {
        (**self).transmit_byte(byte);
    }

    fn rx_available(&self) -> usize {
        (**self).rx_available()
    }

    fn receive_byte(&mut self) -> u8 {
        (**self).receive_byte()
    }

    fn do_error(&mut self, message: &str) {
        (**self).do_error(message);
    }

    fn get_time_ms(&self) -> u32 {
        (**self).get_time_ms()
    }
}
