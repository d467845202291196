//! [`SerialTransport`] adapter for `embedded-io` UARTs.
//!
//! HAL UART drivers expose blocking `embedded_io::{Read, Write, ReadReady}`,
//! which have no notion of a read timeout. `UartTransport` adds one by
//! polling `read_ready()` against a `DelayNs` clock, and keeps a one-byte
//! lookahead so `peek()` can be served without losing data.
//!
//! ```ignore
//! // 9600 baud, 8N1
//! let uart = hal_uart_driver(9_600);
//! let transport = UartTransport::new(uart, Delay);
//! ```

use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};

use crate::peripheral::SerialTransport;

/// Default read timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 1_000;

/// Granularity of the read-timeout polling loop.
pub const POLL_INTERVAL_US: u32 = 100;

/// Blocking UART with timeout and lookahead.
pub struct UartTransport<U, D> {
    uart: U,
    delay: D,
    timeout_ms: u32,
    lookahead: Option<u8>,
}

impl<U, D> UartTransport<U, D>
where
    U: Read + Write + ReadReady,
    D: DelayNs,
{
    /// Wrap a UART and a delay provider. The timeout starts at
    /// [`DEFAULT_TIMEOUT_MS`].
    pub fn new(uart: U, delay: D) -> Self {
        Self {
            uart,
            delay,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            lookahead: None,
        }
    }

    /// Current read timeout in milliseconds.
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Give back the wrapped UART and delay. A pending lookahead byte is lost.
    pub fn release(self) -> (U, D) {
        (self.uart, self.delay)
    }

    fn read_now(&mut self) -> Result<Option<u8>, U::Error> {
        if !self.uart.read_ready()? {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        let n = self.uart.read(&mut byte)?;
        let [value] = byte;
        Ok((n > 0).then_some(value))
    }
}

impl<U, D> SerialTransport for UartTransport<U, D>
where
    U: Read + Write + ReadReady,
    D: DelayNs,
{
    type Error = U::Error;

    fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    fn available(&mut self) -> Result<usize, Self::Error> {
        let pending = usize::from(self.lookahead.is_some());
        let ready = usize::from(self.uart.read_ready()?);
        Ok(pending.saturating_add(ready))
    }

    fn read(&mut self) -> Result<Option<u8>, Self::Error> {
        if let Some(byte) = self.lookahead.take() {
            return Ok(Some(byte));
        }
        let polls = self
            .timeout_ms
            .saturating_mul(1_000)
            .checked_div(POLL_INTERVAL_US)
            .unwrap_or(0);
        for _ in 0..=polls {
            if let Some(byte) = self.read_now()? {
                return Ok(Some(byte));
            }
            self.delay.delay_us(POLL_INTERVAL_US);
        }
        Ok(None)
    }

    fn peek(&mut self) -> Result<Option<u8>, Self::Error> {
        if self.lookahead.is_none() {
            self.lookahead = self.read_now()?;
        }
        Ok(self.lookahead)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.uart.write_all(data)?;
        self.uart.flush()
    }
}
