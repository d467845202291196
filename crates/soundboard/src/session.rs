//! Soundboard session
//!
//! One [`Soundboard`] owns the serial link, the reset line, a delay source
//! and (optionally) a persistent storage slot for the volume.
//!
//! # Request discipline
//!
//! Every operation follows the same steps:
//!
//! 1. Drop whatever is already waiting in the receive path.
//! 2. Write the whole command in one `write` call.
//! 3. Read reply lines into the line buffer and parse them.
//!
//! `&mut self` on every operation keeps exactly one request in flight.
//!
//! # Volume
//!
//! The chip has no "set volume" command and no "get volume" command. The
//! only way to learn the volume is to nudge it and read the echo, so
//! [`Soundboard::begin`] issues one unsaved "volume up" ([`prime_volume`])
//! and every target volume is reached by walking one nudge at a time:
//!
//! ```text
//!            above target          below target
//! current ──────────────→ nudge ↓ ──────────────→ nudge ↑ ──→ save
//!            (repeat)                 (repeat)
//! ```
//!
//! A nudge that leaves the volume unchanged ends the walk. Nudges are sized
//! by the step in [`VolumeConfig`](crate::VolumeConfig), grown whenever the
//! chip moves further than that, and a nudge that would leave the configured
//! range is never sent. If the step was set too small, the first nudge can
//! overshoot; the walk steps back inside the range before anything is saved.
//!
//! [`prime_volume`]: Soundboard::prime_volume

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use heapless::Vec;
use platform::{NoStorage, NvStorage, SerialTransport};

use crate::config::{BannerPolicy, SoundboardConfig, BANNER_MARKER};
use crate::error::{Error, ResponseError};
use crate::line::LineBuffer;
use crate::protocol::{
    self, Command, FileEntry, FileSize, TrackTime, FILE_SIZE_LEN, FILE_TABLE_CAPACITY,
    LINE_BUFFER_CAPACITY, TRACK_TIME_LEN,
};
use crate::volume::VolumeScale;

/// Directory listing kept by the session.
pub type FileTable = Vec<FileEntry, FILE_TABLE_CAPACITY>;

/// Identification line printed by the chip after reset.
pub type Banner = heapless::String<LINE_BUFFER_CAPACITY>;

/// Number of boot lines after the banner.
const BOOT_TRAILER_LINES: usize = 2;

/// Driver for one soundboard chip.
///
/// `T` is the serial link, `RST` the open-drain reset line (low = reset),
/// `D` a blocking delay and `NV` the volume store.
pub struct Soundboard<T, RST, D, NV = NoStorage> {
    transport: T,
    reset: RST,
    delay: D,
    store: NV,
    persist_address: Option<u32>,
    config: SoundboardConfig,
    scale: VolumeScale,
    volume: u8,
    nudge_step: u8,
    primed: bool,
    line: LineBuffer,
    files: FileTable,
    banner: Banner,
}

impl<T, RST, D> Soundboard<T, RST, D, NoStorage> {
    /// Create a session without volume persistence.
    pub fn new(transport: T, reset: RST, delay: D) -> Self {
        Self::assemble(transport, reset, delay, NoStorage, None)
    }
}

impl<T, RST, D, NV> Soundboard<T, RST, D, NV> {
    /// Create a session that saves the raw volume in `store` at `address`
    /// after every change and restores it in [`begin`](Self::begin).
    pub fn with_persistence(transport: T, reset: RST, delay: D, store: NV, address: u32) -> Self {
        Self::assemble(transport, reset, delay, store, Some(address))
    }

    fn assemble(transport: T, reset: RST, delay: D, store: NV, persist_address: Option<u32>) -> Self {
        Self {
            transport,
            reset,
            delay,
            store,
            persist_address,
            config: SoundboardConfig::new(),
            scale: VolumeScale::default(),
            volume: 0,
            nudge_step: 1,
            primed: false,
            line: LineBuffer::new(),
            files: FileTable::new(),
            banner: Banner::new(),
        }
    }

    /// Tear the session down and hand back the collaborators.
    pub fn release(self) -> (T, RST, D, NV) {
        (self.transport, self.reset, self.delay, self.store)
    }

    /// Last raw volume reported by the chip.
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Current volume as a user level.
    pub fn volume_level(&self) -> u8 {
        self.scale.level_from_volume(self.volume)
    }

    /// Volume mapping in use.
    pub fn scale(&self) -> &VolumeScale {
        &self.scale
    }

    /// Configuration in use.
    pub fn config(&self) -> &SoundboardConfig {
        &self.config
    }

    /// Banner line captured by the last [`reset`](Self::reset). Empty
    /// until then.
    pub fn banner(&self) -> &str {
        self.banner.as_str()
    }

    /// Files found by the last [`list_files_cached`](Self::list_files_cached).
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// `true` if the session saves the volume.
    pub fn is_persistent(&self) -> bool {
        self.persist_address.is_some()
    }
}

impl<T, RST, D, NV> Soundboard<T, RST, D, NV>
where
    T: SerialTransport,
    RST: OutputPin,
    D: DelayNs,
    NV: NvStorage,
{
    /// Apply `config`, release the reset line and learn the chip volume.
    ///
    /// With persistence enabled the saved volume is restored (as a level).
    /// Returns the raw volume afterwards.
    pub fn begin(&mut self, config: SoundboardConfig) -> Result<u8, Error<T::Error>> {
        self.configure(config)?;
        self.reset.set_high().map_err(|_| Error::ResetLine)?;

        self.synchronise_volume()?;
        info!(
            "soundboard ready: volume {} (level {})",
            self.volume,
            self.volume_level()
        );
        Ok(self.volume)
    }

    /// Apply `config` without talking to the chip: reply timeout, volume
    /// limits and banner policy. [`begin`](Self::begin) starts with this.
    pub fn configure(&mut self, config: SoundboardConfig) -> Result<(), Error<T::Error>> {
        let scale = config.validate()?;
        self.transport.set_timeout(config.timeout_ms);
        self.config = config;
        self.scale = scale;
        self.nudge_step = config.volume.volume_step.max(1);
        Ok(())
    }

    /// Pulse the reset line, capture the boot banner and re-learn the
    /// volume.
    pub fn reset(&mut self) -> Result<(), Error<T::Error>> {
        debug!("reset pulse {} ms", self.config.reset_pulse_ms);
        self.reset.set_low().map_err(|_| Error::ResetLine)?;
        self.delay.delay_ms(self.config.reset_pulse_ms);
        self.reset.set_high().map_err(|_| Error::ResetLine)?;
        self.delay.delay_ms(self.config.boot_delay_ms);

        // Blank line ahead of the banner
        self.read_line()?;
        self.read_line()?;
        self.banner.clear();
        if self.banner.push_str(self.line.as_str()).is_err() {
            warn!("banner longer than {} bytes", LINE_BUFFER_CAPACITY);
        }
        info!("chip: {}", self.banner.as_str());

        self.delay.delay_ms(self.config.banner_settle_ms);
        for _ in 0..BOOT_TRAILER_LINES {
            self.read_line()?;
            info!("chip: {}", self.line.as_str());
        }

        if !self.banner.contains(BANNER_MARKER) {
            match self.config.banner_policy {
                BannerPolicy::Require => return Err(Error::UnrecognisedBanner),
                BannerPolicy::Ignore => warn!("unrecognised banner, continuing"),
            }
        }

        self.synchronise_volume()
    }

    /// List the files on the chip into `entries`.
    ///
    /// Lines that do not parse are skipped. If the chip reports more files
    /// than `entries` can hold, the rest of the listing is read and
    /// discarded so it cannot leak into the next command. Returns the
    /// number of entries stored.
    pub fn list_files<const N: usize>(
        &mut self,
        entries: &mut Vec<FileEntry, N>,
    ) -> Result<usize, Error<T::Error>> {
        entries.clear();
        self.send(Command::ListFiles)?;

        let mut dropped = 0usize;
        while self.read_line()? > 0 {
            match protocol::parse_file_entry(self.line.as_bytes()) {
                Ok(entry) => {
                    if entries.push(entry).is_err() {
                        dropped = dropped.saturating_add(1);
                    }
                }
                Err(_) => warn!("skipping directory line: {}", self.line.as_str()),
            }
        }
        if dropped > 0 {
            warn!("{} files did not fit in the listing", dropped);
        }
        debug!("listed {} files", entries.len());
        Ok(entries.len())
    }

    /// [`list_files`](Self::list_files) into the session's own table,
    /// readable afterwards through [`files`](Self::files).
    pub fn list_files_cached(&mut self) -> Result<&[FileEntry], Error<T::Error>> {
        let mut files = core::mem::take(&mut self.files);
        let listed = self.list_files(&mut files);
        self.files = files;
        if let Err(e) = listed {
            self.files.clear();
            return Err(e);
        }
        Ok(self.files.as_slice())
    }

    /// Play track number `track` (directory order, from 0).
    pub fn play_track(&mut self, track: u16) -> Result<(), Error<T::Error>> {
        self.send(Command::PlayNumber(track))?;
        self.await_play_marker()?;
        let playing = protocol::parse_play_reply(self.line.as_bytes())?;
        if playing != track {
            return Err(ResponseError::TrackMismatch {
                requested: track,
                playing,
            }
            .into());
        }
        debug!("playing track {}", track);
        Ok(())
    }

    /// Play the file called `name`: 8.3 without the dot, as
    /// [`FileEntry::name`] reports it, trailing padding included.
    pub fn play_file(&mut self, name: &str) -> Result<(), Error<T::Error>> {
        if !protocol::is_valid_file_name(name) {
            return Err(Error::InvalidName);
        }
        self.send(Command::PlayName(name))?;
        self.await_play_marker()?;
        debug!("playing {}", name);
        Ok(())
    }

    /// Pause playback.
    pub fn pause(&mut self) -> Result<(), Error<T::Error>> {
        self.control(Command::Pause)
    }

    /// Resume paused playback.
    pub fn resume(&mut self) -> Result<(), Error<T::Error>> {
        self.control(Command::Resume)
    }

    /// Stop playback.
    pub fn stop(&mut self) -> Result<(), Error<T::Error>> {
        self.control(Command::Stop)
    }

    /// Elapsed and total time of the current track.
    ///
    /// Firmware answers with a short line when nothing is playing and then
    /// misreads the next command. A bare newline and one discarded line put
    /// it back in step before the error is returned.
    pub fn track_time(&mut self) -> Result<TrackTime, Error<T::Error>> {
        self.send(Command::TrackTime)?;
        let len = self.read_line()?;
        if len != TRACK_TIME_LEN {
            warn!("track time reply was {} bytes, resynchronising", len);
            self.send(Command::Resync)?;
            self.read_line()?;
            return Err(Self::length_error(TRACK_TIME_LEN, len));
        }
        Ok(protocol::parse_track_time(self.line.as_bytes())?)
    }

    /// Remaining and total bytes of the current file.
    pub fn file_size(&mut self) -> Result<FileSize, Error<T::Error>> {
        self.send(Command::FileSize)?;
        let len = self.read_line()?;
        if len != FILE_SIZE_LEN {
            return Err(Self::length_error(FILE_SIZE_LEN, len));
        }
        Ok(protocol::parse_file_size(self.line.as_bytes())?)
    }

    /// One step up, saved. Returns the new raw volume.
    pub fn volume_up(&mut self) -> Result<u8, Error<T::Error>> {
        self.nudge(Command::VolumeUp)?;
        self.persist()?;
        Ok(self.volume)
    }

    /// One step down, saved. Returns the new raw volume.
    pub fn volume_down(&mut self) -> Result<u8, Error<T::Error>> {
        self.nudge(Command::VolumeDown)?;
        self.persist()?;
        Ok(self.volume)
    }

    /// Walk the chip to raw volume `target` (clamped to the configured
    /// range) and save it. Returns the raw volume reached.
    pub fn set_volume(&mut self, target: u8) -> Result<u8, Error<T::Error>> {
        let target = self.scale.clamp_volume(target);
        self.walk_to(target)?;
        self.persist()?;
        Ok(self.volume)
    }

    /// Set the volume to `level` (clamped). Returns the level reached.
    pub fn set_volume_level(&mut self, level: u8) -> Result<u8, Error<T::Error>> {
        let target = self.scale.volume_from_level(level);
        debug!("level {} -> raw {}", self.scale.clamp_level(level), target);
        self.set_volume(target)?;
        Ok(self.volume_level())
    }

    /// One level up, stopping at the top.
    pub fn volume_level_up(&mut self) -> Result<u8, Error<T::Error>> {
        self.set_volume_level(self.volume_level().saturating_add(1))
    }

    /// One level down, stopping at the bottom.
    pub fn volume_level_down(&mut self) -> Result<u8, Error<T::Error>> {
        self.set_volume_level(self.volume_level().saturating_sub(1))
    }

    /// One level up, wrapping from the top level to the bottom one.
    pub fn cycle_volume_level(&mut self) -> Result<u8, Error<T::Error>> {
        self.set_volume_level(self.scale.next_level(self.volume_level()))
    }

    /// Learn the chip volume by nudging it up once, without saving.
    pub fn prime_volume(&mut self) -> Result<u8, Error<T::Error>> {
        let volume = self.nudge(Command::VolumeUp)?;
        self.primed = true;
        Ok(volume)
    }

    fn synchronise_volume(&mut self) -> Result<(), Error<T::Error>> {
        self.primed = false;
        self.prime_volume()?;

        let Some(address) = self.persist_address else {
            return Ok(());
        };
        let stored = self.store.read_int(address).map_err(|_| Error::Storage)?;
        match u8::try_from(stored) {
            Ok(saved) => {
                let level = self.scale.level_from_volume(saved);
                info!("restoring saved volume {} (level {})", saved, level);
                self.set_volume_level(level)?;
            }
            Err(_) => warn!(
                "no usable volume at {} (read {}), keeping {}",
                address,
                stored,
                self.volume
            ),
        }
        Ok(())
    }

    fn walk_to(&mut self, target: u8) -> Result<(), Error<T::Error>> {
        let limits = self.scale.config();

        while self.volume > target {
            let before = self.volume;
            if before <= limits.max_volume
                && before.saturating_sub(self.nudge_step) < limits.min_volume
            {
                break;
            }
            if self.nudge(Command::VolumeDown)? >= before {
                warn!("volume stuck at {} walking down", before);
                break;
            }
        }

        while self.volume < target {
            let before = self.volume;
            if before.saturating_add(self.nudge_step) > limits.max_volume {
                break;
            }
            if self.nudge(Command::VolumeUp)? <= before {
                warn!("volume stuck at {} walking up", before);
                break;
            }
        }

        // A nudge taken before the chip's step was known can overshoot.
        while self.volume > limits.max_volume {
            let before = self.volume;
            warn!("volume {} above limit {}, stepping back", before, limits.max_volume);
            if self.nudge(Command::VolumeDown)? >= before {
                break;
            }
        }
        if self.volume < limits.min_volume
            && self.volume.saturating_add(self.nudge_step) <= limits.max_volume
        {
            warn!(
                "volume {} below limit {}, stepping back",
                self.volume,
                limits.min_volume
            );
            self.nudge(Command::VolumeUp)?;
        }

        Ok(())
    }

    fn nudge(&mut self, command: Command<'_>) -> Result<u8, Error<T::Error>> {
        self.send(command)?;
        self.read_line()?;
        let volume = protocol::parse_volume(self.line.as_bytes())?;
        // Only ever grow the step: a reply clamped at the chip's ceiling
        // moves less than a full step.
        let step = volume.abs_diff(self.volume);
        if self.primed && step > self.nudge_step {
            debug!("volume step is {}", step);
            self.nudge_step = step;
        }
        self.volume = volume;
        Ok(volume)
    }

    fn persist(&mut self) -> Result<(), Error<T::Error>> {
        if let Some(address) = self.persist_address {
            self.store
                .write_int(address, i16::from(self.volume))
                .map_err(|_| Error::Storage)?;
            trace!("saved volume {} at {}", self.volume, address);
        }
        Ok(())
    }

    /// Read the echo line and then the play line. Leaves the line holding
    /// the marker in the buffer.
    fn await_play_marker(&mut self) -> Result<(), Error<T::Error>> {
        let echo = self.read_line()?;
        if echo > 0 && protocol::has_play_marker(self.line.as_bytes()) {
            return Ok(());
        }
        let reply = self.read_line()?;
        if protocol::has_play_marker(self.line.as_bytes()) {
            return Ok(());
        }
        if echo == 0 && reply == 0 {
            return Err(ResponseError::NoResponse.into());
        }
        warn!("play refused: {}", self.line.as_str());
        Err(ResponseError::MissingMarker.into())
    }

    fn control(&mut self, command: Command<'_>) -> Result<(), Error<T::Error>> {
        self.send(command)?;
        self.read_line()?;
        match command.acknowledgement() {
            Some(expected) => {
                protocol::check_acknowledgement(self.line.as_bytes(), expected)?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn send(&mut self, command: Command<'_>) -> Result<(), Error<T::Error>> {
        let bytes = command.encode().ok_or(Error::InvalidName)?;
        let stale = self.transport.drain().map_err(Error::Transport)?;
        if stale > 0 {
            debug!("dropped {} stale bytes before {}", stale, command.label());
        }
        debug!("tx {}", command.label());
        self.transport.write(&bytes).map_err(Error::Transport)
    }

    fn read_line(&mut self) -> Result<usize, Error<T::Error>> {
        self.line
            .read_from(&mut self.transport)
            .map_err(Error::Transport)
    }

    fn length_error(expected: usize, actual: usize) -> Error<T::Error> {
        if actual == 0 {
            ResponseError::NoResponse.into()
        } else {
            ResponseError::UnexpectedLength { expected, actual }.into()
        }
    }
}
