//! Volume persistence tests: save on change, restore on `begin`.
// Integration test file: expect/unwrap/panic are intentional test mechanisms.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//!
//! Run with: cargo test -p soundboard --test integration_persistence

use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};
use platform::mocks::{FailingStore, MemoryStore, SimulatedChip};
use soundboard::{Error, Soundboard, SoundboardConfig, VolumeConfig};

const SLOT: u32 = 0x10;

fn released() -> PinMock {
    PinMock::new(&[Transaction::set(State::High)])
}

/// Start a persistent session on `chip`, run `body`, return the store.
fn session<'c>(
    chip: &'c mut SimulatedChip,
    store: MemoryStore,
    config: SoundboardConfig,
    body: impl FnOnce(&mut Soundboard<&'c mut SimulatedChip, PinMock, NoopDelay, MemoryStore>),
) -> MemoryStore {
    let mut sb = Soundboard::with_persistence(chip, released(), NoopDelay, store, SLOT);
    sb.begin(config).expect("begin should succeed");
    body(&mut sb);
    let (_, mut pin, _, store) = sb.release();
    pin.done();
    store
}

#[test]
fn test_level_survives_power_cycle() {
    let mut first_chip = SimulatedChip::new(100);
    let store = session(&mut first_chip, MemoryStore::new(), SoundboardConfig::default(), |sb| {
        assert_eq!(sb.set_volume_level(3).unwrap(), 3);
    });
    assert_eq!(store.get(SLOT), Some(61));

    // Fresh chip at a different volume, same store.
    let mut second_chip = SimulatedChip::new(150);
    let store = session(&mut second_chip, store, SoundboardConfig::default(), |sb| {
        assert_eq!(sb.volume_level(), 3);
        assert_eq!(sb.volume(), 61);
    });
    assert_eq!(second_chip.volume(), 61);
    assert_eq!(store.get(SLOT), Some(61));
}

#[test]
fn test_prime_nudge_is_not_saved() {
    let mut chip = SimulatedChip::new(40);
    let store = session(&mut chip, MemoryStore::new(), SoundboardConfig::default(), |_| {});
    // Erased slot: nothing restored, nothing written.
    assert_eq!(store.get(SLOT), None);
    assert_eq!(store.write_count(), 0);
    assert_eq!(chip.volume(), 41);
}

#[test]
fn test_every_volume_change_is_saved() {
    let mut chip = SimulatedChip::new(100);
    let store = session(&mut chip, MemoryStore::new(), SoundboardConfig::default(), |sb| {
        sb.volume_up().unwrap();
        sb.volume_down().unwrap();
        sb.volume_down().unwrap();
    });
    assert_eq!(store.get(SLOT), Some(100));
    assert_eq!(store.write_count(), 3);
}

#[test]
fn test_out_of_range_saved_value_is_ignored() {
    let mut chip = SimulatedChip::new(100);
    let store = MemoryStore::new().with_value(SLOT, 999);
    let store = session(&mut chip, store, SoundboardConfig::default(), |sb| {
        assert_eq!(sb.volume(), 101);
    });
    assert_eq!(store.get(SLOT), Some(999));
}

#[test]
fn test_restore_respects_new_limits() {
    // Saved at full volume, restored under a lower cap.
    let mut chip = SimulatedChip::new(100);
    let store = MemoryStore::new().with_value(SLOT, 204);
    let config = SoundboardConfig::new().with_volume(VolumeConfig::new().with_maximum_volume(150));
    let store = session(&mut chip, store, config, |sb| {
        assert_eq!(sb.volume_level(), 10);
        assert_eq!(sb.volume(), 150);
    });
    assert_eq!(store.get(SLOT), Some(150));
}

#[test]
fn test_overshoot_is_not_saved() {
    let mut chip = SimulatedChip::new(175).with_volume_step(3);
    let config = SoundboardConfig::new().with_volume(VolumeConfig::new().with_maximum_volume(180));
    let store = session(&mut chip, MemoryStore::new(), config, |sb| {
        sb.set_volume_level(10).unwrap();
    });
    assert_eq!(chip.volume(), 178);
    assert_eq!(store.get(SLOT), Some(178));
    assert_eq!(store.write_count(), 1);
}

#[test]
fn test_storage_failure_is_reported() {
    let mut chip = SimulatedChip::new(100);
    let mut sb = Soundboard::with_persistence(&mut chip, released(), NoopDelay, FailingStore, SLOT);

    assert_eq!(sb.begin(SoundboardConfig::default()), Err(Error::Storage));
    let (_, mut pin, _, _) = sb.release();
    pin.done();
}

#[test]
fn test_non_persistent_session_reports_so() {
    let mut chip = SimulatedChip::new(100);
    let sb = Soundboard::new(&mut chip, PinMock::new(&[]), NoopDelay);
    assert!(!sb.is_persistent());
    let (_, mut pin, _, _) = sb.release();
    pin.done();
}
