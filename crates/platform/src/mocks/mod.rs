//! Mock implementations for testing
//!
//! Host-side stand-ins for the collaborator traits, for use in unit and
//! integration tests of drivers built on this crate. [`SimulatedChip`]
//! models a whole soundboard behind the serial link.

#![cfg(any(test, feature = "std"))]

extern crate std;

use std::collections::{BTreeMap, VecDeque};
use std::vec::Vec;

use crate::{NvStorage, SerialTransport};

mod chip;

pub use chip::{ChipState, SimulatedChip, BOOT_TEXT};

/// Serial mock that answers each write with the next scripted reply.
///
/// Bytes queued with [`push_rx`](Self::push_rx) are readable immediately
/// (unsolicited or stale data). Replies queued with
/// [`reply`](Self::reply) are released one per `write` call, so a driver
/// that drains stale input before sending a command still sees its reply.
/// Reads on an empty receive queue time out instantly with `Ok(None)`.
#[derive(Debug, Default)]
pub struct ScriptedSerial {
    rx: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    writes: Vec<Vec<u8>>,
    timeout_ms: Option<u32>,
}

impl ScriptedSerial {
    /// Create an idle mock with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bytes` readable right now.
    pub fn push_rx(&mut self, bytes: &[u8]) -> &mut Self {
        self.rx.extend(bytes.iter().copied());
        self
    }

    /// Queue the reply for the next `write` call.
    pub fn reply(&mut self, bytes: &[u8]) -> &mut Self {
        self.replies.push_back(bytes.to_vec());
        self
    }

    /// Everything the driver has written, concatenated.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Every `write` call, one entry each.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Bytes still waiting to be read.
    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    /// Replies that were scripted but never released.
    pub fn unused_replies(&self) -> usize {
        self.replies.len()
    }

    /// Last timeout set by the driver, if any.
    pub fn timeout_ms(&self) -> Option<u32> {
        self.timeout_ms
    }
}

impl SerialTransport for ScriptedSerial {
    type Error = core::convert::Infallible;

    fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = Some(timeout_ms);
    }

    fn available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.rx.len())
    }

    fn read(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.rx.pop_front())
    }

    fn peek(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.rx.front().copied())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.written.extend_from_slice(data);
        self.writes.push(data.to_vec());
        if let Some(reply) = self.replies.pop_front() {
            self.rx.extend(reply);
        }
        Ok(())
    }
}

/// In-memory [`NvStorage`] keyed by address.
///
/// Unwritten addresses read back as `-1`, like erased EEPROM.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: BTreeMap<u32, i16>,
    write_count: usize,
}

impl MemoryStore {
    /// Create an empty (erased) store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a value, as if written by an earlier power cycle.
    pub fn with_value(mut self, address: u32, value: i16) -> Self {
        self.slots.insert(address, value);
        self
    }

    /// Value at `address`, if it was ever written.
    pub fn get(&self, address: u32) -> Option<i16> {
        self.slots.get(&address).copied()
    }

    /// Number of `write_int` calls so far.
    pub fn write_count(&self) -> usize {
        self.write_count
    }
}

impl NvStorage for MemoryStore {
    type Error = core::convert::Infallible;

    fn read_int(&mut self, address: u32) -> Result<i16, Self::Error> {
        Ok(self.slots.get(&address).copied().unwrap_or(-1))
    }

    #[allow(clippy::arithmetic_side_effects)] // Mock counter; overflow not a concern in tests
    fn write_int(&mut self, address: u32, value: i16) -> Result<(), Self::Error> {
        self.slots.insert(address, value);
        self.write_count += 1;
        Ok(())
    }
}

/// Storage whose every access fails, for error-path tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

/// Error returned by [`FailingStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreFault;

impl NvStorage for FailingStore {
    type Error = StoreFault;

    fn read_int(&mut self, _address: u32) -> Result<i16, Self::Error> {
        Err(StoreFault)
    }

    fn write_int(&mut self, _address: u32, _value: i16) -> Result<(), Self::Error> {
        Err(StoreFault)
    }
}
