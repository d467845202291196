//! Reply line buffer

use platform::SerialTransport;

use crate::protocol::LINE_BUFFER_CAPACITY;

/// Fixed-capacity buffer holding the most recent reply line.
///
/// A line ends at `\n`, when the buffer fills, or when a read times out.
/// The terminator is never stored. The chip may follow `\n` with `\r`, or
/// end lines with `\r\n`; either way the `\r` is dropped.
#[derive(Debug, Clone)]
pub struct LineBuffer<const N: usize = LINE_BUFFER_CAPACITY> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> LineBuffer<N> {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        Self {
            bytes: [0; N],
            len: 0,
        }
    }

    /// Read the next line from `transport`, replacing the previous one.
    ///
    /// Returns the number of bytes kept. `0` means the chip sent nothing
    /// before the timeout, or sent an empty line.
    pub fn read_from<T: SerialTransport>(&mut self, transport: &mut T) -> Result<usize, T::Error> {
        let count = transport.read_bytes_until(b'\n', &mut self.bytes)?;
        if transport.peek()? == Some(b'\r') {
            let _ = transport.read()?;
        }
        self.len = count;
        if self.as_bytes().last() == Some(&b'\r') {
            self.len = count.saturating_sub(1);
        }
        trace!("rx line ({} bytes): {}", self.len, self.as_str());
        Ok(self.len)
    }

    /// Bytes of the current line.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.get(..self.len).unwrap_or_default()
    }

    /// Current line as text. Lines that are not UTF-8 show as `"<binary>"`.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or("<binary>")
    }

    /// Length of the current line.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the current line is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum line length.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Forget the current line.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
