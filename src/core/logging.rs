//! Debug logging hook
//!
//! The server reports protocol faults through the HAL error sink; the
//! only other diagnostics it emits are a few debug lines around
//! registration and header transmission. This single macro routes them
//! to defmt when the `defmt` feature is on, to stdout in host test
//! builds, and compiles them out everywhere else.

/// Emit a debug diagnostic through the active sink, if any.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        ::std::println!("[picolink] {}", ::std::format!($($arg)*));
    }};
}
