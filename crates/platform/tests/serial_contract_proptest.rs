//! Property-based tests for the serial and storage contracts.
//! Verifies invariants hold for ALL byte streams, not just fixed examples.
#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]

use std::collections::VecDeque;

use embedded_storage::{ReadStorage, Storage};
use platform::{NvStorage, SerialTransport, StorageSlot};

/// Receive-only serial stub. `platform::mocks` is not built for
/// integration tests unless the `std` feature is on.
#[derive(Default)]
struct Stream(VecDeque<u8>);

impl Stream {
    fn with(bytes: &[u8]) -> Self {
        Self(bytes.iter().copied().collect())
    }
}

impl SerialTransport for Stream {
    type Error = core::convert::Infallible;

    fn set_timeout(&mut self, _timeout_ms: u32) {}

    fn available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.0.len())
    }

    fn read(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.0.pop_front())
    }

    fn peek(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.0.front().copied())
    }

    fn write(&mut self, _data: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// 64 bytes of byte-addressable RAM pretending to be an EEPROM.
struct RamEeprom([u8; 64]);

impl ReadStorage for RamEeprom {
    type Error = ();

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let src = self.0.get(start..start + bytes.len()).ok_or(())?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.0.len()
    }
}

impl Storage for RamEeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let dst = self.0.get_mut(start..start + bytes.len()).ok_or(())?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}

proptest::proptest! {
    /// A line read never overruns the buffer and never stores the terminator.
    #[test]
    fn read_bytes_until_respects_buffer(
        stream in proptest::collection::vec(0u8..=255, 0..200),
        cap in 1usize..=80,
    ) {
        let mut serial = Stream::with(&stream);
        let mut buf = vec![0u8; cap];

        let n = serial.read_bytes_until(b'\n', &mut buf).unwrap();
        assert!(n <= cap);
        assert!(!buf[..n].contains(&b'\n'));
        assert_eq!(&buf[..n], &stream[..n]);
    }

    /// The terminator is consumed together with the line before it.
    #[test]
    fn read_bytes_until_consumes_terminator(
        line in proptest::collection::vec(0u8..=9, 0..40),
        rest in proptest::collection::vec(0u8..=255, 0..40),
    ) {
        let mut stream = line.clone();
        stream.push(b'\n');
        stream.extend_from_slice(&rest);
        let mut serial = Stream::with(&stream);
        let mut buf = [0u8; 80];

        let n = serial.read_bytes_until(b'\n', &mut buf).unwrap();
        assert_eq!(&buf[..n], line.as_slice());
        assert_eq!(serial.0.len(), rest.len());
    }

    /// Draining leaves nothing readable.
    #[test]
    fn drain_empties_receive_queue(stream in proptest::collection::vec(0u8..=255, 0..200)) {
        let mut serial = Stream::with(&stream);
        assert_eq!(serial.drain().unwrap(), stream.len());
        assert_eq!(serial.available().unwrap(), 0);
    }

    /// Every i16 survives a write/read through a storage slot.
    #[test]
    fn storage_slot_keeps_any_value(value in i16::MIN..=i16::MAX, address in 0u32..=62) {
        let mut slot = StorageSlot::new(RamEeprom([0xFF; 64]));
        slot.write_int(address, value).unwrap();
        assert_eq!(slot.read_int(address).unwrap(), value);
    }
}

#[test]
fn storage_slot_out_of_range_is_an_error() {
    let mut slot = StorageSlot::new(RamEeprom([0xFF; 64]));
    assert!(slot.write_int(63, 1).is_err());
    assert!(slot.read_int(200).is_err());
}
