//! Serial peripheral abstraction layer
//!
//! The soundboard speaks a line-oriented ASCII protocol over a half-duplex
//! UART. Drivers only need a handful of byte-stream primitives with a read
//! timeout, modelled here as [`SerialTransport`].

/// Blocking byte stream with a bounded read timeout.
///
/// A read that sees no byte within the configured timeout is not an error:
/// it yields `Ok(None)`, and callers decide what an absent response means.
/// Transport-level failures (framing, overrun, bus faults) are reported
/// through [`Self::Error`].
pub trait SerialTransport {
    /// Error type
    type Error: core::fmt::Debug;

    /// Set the timeout applied to every blocking read, in milliseconds.
    fn set_timeout(&mut self, timeout_ms: u32);

    /// Number of bytes that can be read without blocking.
    fn available(&mut self) -> Result<usize, Self::Error>;

    /// Read one byte, blocking for at most the configured timeout.
    fn read(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Look at the next byte without consuming it. Never blocks.
    fn peek(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Write all bytes.
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Read into `buffer` until `terminator` is seen, the buffer is full, or
    /// a read times out.
    ///
    /// The terminator is consumed but not stored. Returns the number of
    /// bytes placed in `buffer`; `0` means nothing arrived before the
    /// timeout (or the line was empty).
    fn read_bytes_until(&mut self, terminator: u8, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0usize;
        for slot in buffer.iter_mut() {
            match self.read()? {
                Some(byte) if byte != terminator => {
                    *slot = byte;
                    count = count.saturating_add(1);
                }
                _ => break,
            }
        }
        Ok(count)
    }

    /// Discard every byte that is already waiting in the receive path.
    ///
    /// Returns how many bytes were dropped.
    fn drain(&mut self) -> Result<usize, Self::Error> {
        let mut dropped = 0usize;
        while self.available()? > 0 {
            if self.read()?.is_none() {
                break;
            }
            dropped = dropped.saturating_add(1);
        }
        Ok(dropped)
    }
}

impl<T: SerialTransport + ?Sized> SerialTransport for &mut T {
    type Error = T::Error;

    fn set_timeout(&mut self, timeout_ms: u32) {
        T::set_timeout(self, timeout_ms);
    }

    fn available(&mut self) -> Result<usize, Self::Error> {
        T::available(self)
    }

    fn read(&mut self) -> Result<Option<u8>, Self::Error> {
        T::read(self)
    }

    fn peek(&mut self) -> Result<Option<u8>, Self::Error> {
        T::peek(self)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        T::write(self, data)
    }
}
