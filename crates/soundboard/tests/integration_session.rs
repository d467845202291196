//! Session integration tests: the driver against a simulated chip.
// Integration test file: expect/unwrap/panic are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]
//!
//! Every command goes through `Soundboard` and `SimulatedChip`, so these
//! tests cover the request discipline, reply parsing and chip-side state
//! together. Byte-exact replies the simulator does not produce are driven
//! with `platform::mocks::ScriptedSerial`.
//!
//! Run with: cargo test -p soundboard --test integration_session

use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};
use platform::mocks::{ChipState, ScriptedSerial, SimulatedChip};
use soundboard::protocol::FILE_TABLE_CAPACITY;
use soundboard::{
    Error, FileEntry, FileSize, ResponseError, Soundboard, SoundboardConfig, TrackTime,
    VolumeConfig,
};

fn chip() -> SimulatedChip {
    SimulatedChip::new(100)
        .with_file("T00     OGG", 51_892, 30)
        .with_file("04LATCHWAV", 4_096, 4)
        .with_file("LONGTUNEMP3", 7_340_032, 240)
}

/// Run `body` against a started session, then check the reset line saw
/// exactly the release from `begin`.
fn with_session<'c, R>(
    chip: &'c mut SimulatedChip,
    config: SoundboardConfig,
    body: impl FnOnce(&mut Soundboard<&'c mut SimulatedChip, PinMock, NoopDelay>) -> R,
) -> R {
    let pin = PinMock::new(&[Transaction::set(State::High)]);
    let mut board = Soundboard::new(chip, pin, NoopDelay);
    board.begin(config).expect("begin should succeed");
    let result = body(&mut board);
    let (_, mut pin, _, _) = board.release();
    pin.done();
    result
}

#[test]
fn test_begin_learns_volume_with_one_nudge() {
    let mut chip = chip();
    let volume = with_session(&mut chip, SoundboardConfig::default(), |sb| sb.volume());
    assert_eq!(volume, 101);
    assert_eq!(chip.volume(), 101);
    assert_eq!(chip.commands(), 1);
    assert_eq!(chip.timeout_ms(), Some(500));
}

#[test]
fn test_list_files_decodes_every_entry() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        let files = sb.list_files_cached().unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].name.as_str(), "T00     OGG");
        assert_eq!(files[0].size, 51_892);
        assert_eq!(files[1].name.as_str(), "04LATCHWAV");
        assert_eq!(files[2].size, 7_340_032);
        assert_eq!(sb.files().len(), 3);
    });
}

#[test]
fn test_list_files_into_small_table_drains_the_rest() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        let mut files: heapless::Vec<FileEntry, 2> = heapless::Vec::new();
        assert_eq!(sb.list_files(&mut files).unwrap(), 2);
        // The third line must not be mistaken for the next reply.
        assert_eq!(sb.volume_up().unwrap(), 102);
    });
}

#[test]
fn test_listing_larger_than_file_table() {
    let mut chip = SimulatedChip::new(50);
    for i in 0..30u32 {
        let name = format!("TRACK{i:02}WAV");
        chip = chip.with_file(&name, 1_000 + i, 10);
    }
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        let files = sb.list_files_cached().unwrap();
        assert_eq!(files.len(), FILE_TABLE_CAPACITY);
        assert_eq!(files[24].name.as_str(), "TRACK24WAV");
    });
}

#[test]
fn test_listing_parses_exact_wire_line() {
    let mut serial = ScriptedSerial::new();
    serial.reply(b"04LATCHWAV\t0000051892\n\n");
    let mut sb = Soundboard::new(&mut serial, PinMock::new(&[]), NoopDelay);

    let files = sb.list_files_cached().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name.as_str(), "04LATCHWAV");
    assert_eq!(files[0].size, 51_892);
    let (_, mut pin, _, _) = sb.release();
    pin.done();
}

#[test]
fn test_play_pause_resume_stop() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        sb.play_track(1).unwrap();
        sb.pause().unwrap();
        sb.resume().unwrap();
        sb.stop().unwrap();
    });
    assert_eq!(chip.state(), ChipState::Idle);
}

#[test]
fn test_play_by_name() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        sb.play_file("LONGTUNEMP3").unwrap();
    });
    assert_eq!(chip.state(), ChipState::Playing(2));
}

#[test]
fn test_listed_name_plays_as_is() {
    let mut chip = SimulatedChip::new(100).with_file("BELL    WA ", 2_048, 2);
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        let name = sb.list_files_cached().unwrap()[0].name.clone();
        assert_eq!(name.as_str(), "BELL    WA ");
        sb.play_file(&name).unwrap();
    });
    assert_eq!(chip.state(), ChipState::Playing(0));
}

#[test]
fn test_play_missing_track_or_name() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        assert_eq!(
            sb.play_track(9),
            Err(Error::Response(ResponseError::MissingMarker))
        );
        assert_eq!(
            sb.play_file("NOSUCHFILE"),
            Err(Error::Response(ResponseError::MissingMarker))
        );
    });
    assert_eq!(chip.state(), ChipState::Idle);
}

#[test]
fn test_play_track_number_echo() {
    let mut serial = ScriptedSerial::new();
    serial.reply(b"\nplay7\n").reply(b"\nplay9\n");
    let mut sb = Soundboard::new(&mut serial, PinMock::new(&[]), NoopDelay);

    assert!(sb.play_track(7).is_ok());
    assert_eq!(
        sb.play_track(7),
        Err(Error::Response(ResponseError::TrackMismatch {
            requested: 7,
            playing: 9
        }))
    );
    let (_, mut pin, _, _) = sb.release();
    pin.done();
}

#[test]
fn test_pause_when_idle_times_out() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        let err = sb.pause().unwrap_err();
        assert!(err.is_timeout());
    });
}

#[test]
fn test_track_time_while_playing() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        sb.play_track(2).unwrap();
    });
    chip.advance(75);
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        assert_eq!(
            sb.track_time().unwrap(),
            TrackTime {
                current_secs: 75,
                total_secs: 240
            }
        );
        assert_eq!(
            sb.file_size().unwrap(),
            FileSize {
                remaining: 7_340_032 - 75 * 1_024,
                total: 7_340_032
            }
        );
    });
}

#[test]
fn test_track_time_exact_reply() {
    let mut serial = ScriptedSerial::new();
    serial.reply(b"001200030000\n");
    let mut sb = Soundboard::new(&mut serial, PinMock::new(&[]), NoopDelay);

    assert_eq!(
        sb.track_time().unwrap(),
        TrackTime {
            current_secs: 1_200,
            total_secs: 30_000
        }
    );
    let (_, mut pin, _, _) = sb.release();
    pin.done();
}

#[test]
fn test_track_time_when_idle_recovers_protocol() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        assert_eq!(
            sb.track_time(),
            Err(Error::Response(ResponseError::UnexpectedLength {
                expected: 12,
                actual: 1
            }))
        );
        // Without the resync the chip would swallow this listing.
        assert_eq!(sb.list_files_cached().unwrap().len(), 3);
    });
    assert!(!chip.is_desynced());
}

#[test]
fn test_file_size_when_idle() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        assert!(sb.file_size().unwrap_err().is_timeout());
    });
}

#[test]
fn test_stale_bytes_are_dropped_before_each_command() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        sb.play_track(0).unwrap();
    });
    chip.inject(b"garbage\nmore garbage\n");
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        sb.stop().unwrap();
    });
}

#[test]
fn test_volume_up_and_down() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        assert_eq!(sb.volume_up().unwrap(), 102);
        assert_eq!(sb.volume_down().unwrap(), 101);
        assert_eq!(sb.volume_down().unwrap(), 100);
    });
    assert_eq!(chip.volume(), 100);
}

#[test]
fn test_set_volume_walks_to_target() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        assert_eq!(sb.set_volume(90).unwrap(), 90);
        assert_eq!(sb.set_volume(95).unwrap(), 95);
    });
    assert_eq!(chip.volume(), 95);
}

#[test]
fn test_set_volume_clamps_to_configured_maximum() {
    let mut chip = chip();
    let config = SoundboardConfig::new().with_volume(VolumeConfig::new().with_maximum_volume(150));
    with_session(&mut chip, config, |sb| {
        assert_eq!(sb.set_volume(250).unwrap(), 150);
    });
    assert_eq!(chip.volume(), 150);
}

#[test]
fn test_set_volume_level_maps_through_scale() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        assert_eq!(sb.set_volume_level(3).unwrap(), 3);
        assert_eq!(sb.volume(), 61);
        assert_eq!(sb.set_volume_level(42).unwrap(), 10);
        assert_eq!(sb.volume(), 204);
        assert_eq!(sb.volume_level_up().unwrap(), 10);
        assert_eq!(sb.volume_level_down().unwrap(), 9);
    });
}

/// Raw limits 20..=180 with the given nudge step.
fn bounded(step: u8) -> SoundboardConfig {
    SoundboardConfig::new().with_volume(
        VolumeConfig::new()
            .with_minimum_volume(20)
            .with_maximum_volume(180)
            .with_volume_step(step),
    )
}

#[test]
fn test_set_volume_level_never_leaves_bounds() {
    // Starts just inside each limit once the priming nudge has moved them.
    for start in [17, 19, 100, 175] {
        let mut chip = SimulatedChip::new(start).with_volume_step(3);
        with_session(&mut chip, bounded(3), |sb| {
            for level in [10, 0, 7, 3, 10, 1, 0, 10] {
                sb.set_volume_level(level).unwrap();
                assert!((20..=180).contains(&sb.volume()), "start {start}: {}", sb.volume());
            }
        });
        // Everything after the priming nudge stays inside the limits.
        let walked = &chip.volume_history()[1..];
        assert!(
            walked.iter().all(|v| (20..=180).contains(v)),
            "start {start}: {walked:?}"
        );
    }
}

#[test]
fn test_unlearned_step_overshoot_is_stepped_back() {
    // Step configured as 1, chip moves 3: the first nudge overshoots.
    let mut chip = SimulatedChip::new(175).with_volume_step(3);
    with_session(&mut chip, bounded(1), |sb| {
        assert_eq!(sb.set_volume_level(10).unwrap(), 10);
        assert_eq!(sb.volume(), 178);
    });
    assert_eq!(chip.volume_history(), &[178, 181, 178]);

    let mut chip = SimulatedChip::new(19).with_volume_step(3);
    with_session(&mut chip, bounded(1), |sb| {
        sb.set_volume_level(0).unwrap();
        assert_eq!(sb.volume(), 22);
    });
    assert_eq!(chip.volume_history(), &[22, 19, 22]);
}

#[test]
fn test_cycle_volume_level_returns_to_start() {
    let mut chip = chip();
    with_session(&mut chip, SoundboardConfig::default(), |sb| {
        let start = sb.set_volume_level(4).unwrap();
        let mut seen = Vec::new();
        for _ in 0..=10 {
            seen.push(sb.cycle_volume_level().unwrap());
        }
        assert_eq!(seen, vec![5, 6, 7, 8, 9, 10, 0, 1, 2, 3, 4]);
        assert_eq!(sb.volume_level(), start);
    });
}

#[test]
fn test_cycle_with_lower_level_one() {
    let mut chip = chip();
    let config = SoundboardConfig::new().with_volume(VolumeConfig::new().use_lower_level_one(true));
    with_session(&mut chip, config, |sb| {
        sb.set_volume_level(10).unwrap();
        assert_eq!(sb.cycle_volume_level().unwrap(), 1);
        assert_eq!(sb.volume(), 0);
    });
}

#[test]
fn test_coarse_chip_step_is_learned() {
    let mut chip = SimulatedChip::new(100).with_volume_step(4);
    let config = SoundboardConfig::new().with_volume(VolumeConfig::new().with_maximum_volume(190));
    with_session(&mut chip, config, |sb| {
        assert_eq!(sb.volume(), 104);
        // 104 → 100 → ... → 60 walking down, then one step back up.
        assert_eq!(sb.set_volume(61).unwrap(), 64);
        // 188 + 4 would pass the configured maximum, so that nudge is not sent.
        assert_eq!(sb.set_volume(190).unwrap(), 188);
    });
    assert_eq!(chip.volume(), 188);
}

#[test]
fn test_unresponsive_chip_fails_begin() {
    let mut serial = ScriptedSerial::new();
    let pin = PinMock::new(&[Transaction::set(State::High)]);
    let mut sb = Soundboard::new(&mut serial, pin, NoopDelay);

    let err = sb.begin(SoundboardConfig::default()).unwrap_err();
    assert!(err.is_timeout());
    let (_, mut pin, _, _) = sb.release();
    pin.done();
}
