//! Transport abstraction for any byte-oriented duplex channel.
//!
//! Concrete implementations:
//! - UART (`adapters::uart_transport`, ESP-IDF only)
//! - In-memory loopback pair (`adapters::loopback`, host tests and simulation)
//!
//! The [`Link`](super::Link) is generic over `Transport`, so swapping the
//! physical channel requires zero changes to the session logic.

/// Byte-oriented transport channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// One receive poll: read up to `buf.len()` bytes into `buf`.
    ///
    /// May wait at most one poll interval for data to arrive.
    /// Returns 0 if nothing arrived within that interval.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually accepted (0 when the TX path is full).
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// A null transport that discards all writes and never reads.
/// Useful as a peer that has gone silent.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}
