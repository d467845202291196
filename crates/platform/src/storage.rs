//! Non-volatile storage abstraction
//!
//! The driver persists a single integer (the raw chip volume) across power
//! cycles. [`NvStorage`] is that contract: one fixed-size slot per address,
//! no wear-levelling and no versioning.

use embedded_storage::Storage;

/// Width of one slot in bytes (a 16-bit signed integer).
pub const SLOT_SIZE: usize = 2;

/// Integer slot storage (EEPROM-style).
pub trait NvStorage {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read the integer stored at `address`.
    fn read_int(&mut self, address: u32) -> Result<i16, Self::Error>;

    /// Store `value` at `address`.
    fn write_int(&mut self, address: u32, value: i16) -> Result<(), Self::Error>;
}

impl<T: NvStorage + ?Sized> NvStorage for &mut T {
    type Error = T::Error;

    fn read_int(&mut self, address: u32) -> Result<i16, Self::Error> {
        T::read_int(self, address)
    }

    fn write_int(&mut self, address: u32, value: i16) -> Result<(), Self::Error> {
        T::write_int(self, address, value)
    }
}

/// Placeholder storage for sessions without persistence.
///
/// Reads return `0`, writes are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoStorage;

impl NvStorage for NoStorage {
    type Error = core::convert::Infallible;

    fn read_int(&mut self, _address: u32) -> Result<i16, Self::Error> {
        Ok(0)
    }

    fn write_int(&mut self, _address: u32, _value: i16) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// [`NvStorage`] on top of any `embedded_storage::Storage` (EEPROM, emulated
/// EEPROM on flash, FRAM, ...).
///
/// Values are stored little-endian in [`SLOT_SIZE`] bytes at the given
/// byte address.
pub struct StorageSlot<S> {
    storage: S,
}

impl<S: Storage> StorageSlot<S> {
    /// Wrap a storage device.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Give back the wrapped device.
    pub fn release(self) -> S {
        self.storage
    }
}

impl<S> NvStorage for StorageSlot<S>
where
    S: Storage,
    S::Error: core::fmt::Debug,
{
    type Error = S::Error;

    fn read_int(&mut self, address: u32) -> Result<i16, Self::Error> {
        let mut bytes = [0u8; SLOT_SIZE];
        self.storage.read(address, &mut bytes)?;
        Ok(i16::from_le_bytes(bytes))
    }

    fn write_int(&mut self, address: u32, value: i16) -> Result<(), Self::Error> {
        self.storage.write(address, &value.to_le_bytes())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embedded_storage::ReadStorage;

    /// 16-byte RAM "EEPROM", erased to 0xFF.
    struct RamEeprom([u8; 16]);

    #[derive(Debug, PartialEq)]
    struct OutOfBounds;

    impl ReadStorage for RamEeprom {
        type Error = OutOfBounds;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            let src = self.0.get(start..start + bytes.len()).ok_or(OutOfBounds)?;
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
            let dst = self.0.get_mut(start..start + bytes.len()).ok_or(OutOfBounds)?;
            dst.copy_from_slice(bytes);
            Ok(())
        }
    }

    #[test]
    fn test_slot_round_trip() {
        let mut slot = StorageSlot::new(RamEeprom([0xFF; 16]));
        slot.write_int(4, 122).unwrap();
        assert_eq!(slot.read_int(4).unwrap(), 122);
    }

    #[test]
    fn test_slot_is_little_endian() {
        let mut slot = StorageSlot::new(RamEeprom([0xFF; 16]));
        slot.write_int(0, 0x0102).unwrap();
        let eeprom = slot.release();
        assert_eq!(&eeprom.0[..2], &[0x02, 0x01]);
    }

    #[test]
    fn test_erased_slot_reads_minus_one() {
        let mut slot = StorageSlot::new(RamEeprom([0xFF; 16]));
        assert_eq!(slot.read_int(0).unwrap(), -1);
    }

    #[test]
    fn test_out_of_bounds_is_error() {
        let mut slot = StorageSlot::new(RamEeprom([0xFF; 16]));
        assert_eq!(slot.write_int(15, 1), Err(OutOfBounds));
    }

    #[test]
    fn test_no_storage_is_inert() {
        let mut store = NoStorage;
        store.write_int(0, 99).unwrap();
        assert_eq!(store.read_int(0).unwrap(), 0);
    }
}
