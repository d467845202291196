//! Simulated VS1000 soundboard chip
//!
//! [`SimulatedChip`] implements [`SerialTransport`] and answers commands
//! the way the chip firmware does: it keeps a directory, a playback state
//! and a raw volume, and echoes replies into its receive queue.

use core::convert::Infallible;
use core::fmt::Write as _;

use heapless::{Deque, String, Vec};

use crate::SerialTransport;

/// Highest raw volume of current chip firmware.
const CHIP_MAX_VOLUME: u8 = 204;
/// 8.3 name without the dot.
const NAME_LEN: usize = 11;
/// Longest command line the firmware accepts.
const INPUT_CAPACITY: usize = 80;
const RX_CAPACITY: usize = 2048;
const MAX_FILES: usize = 32;
const HISTORY_CAPACITY: usize = 512;
const REPLY_CAPACITY: usize = 96;

/// Boot text printed by the chip after reset.
pub const BOOT_TEXT: &[u8] = b"\n\rAdafruit FX Sound Board 9/10/14\n\rFAT type: FAT16\n\rFiles: 3\n\r";

type FileName = String<NAME_LEN>;

#[derive(Debug, Clone)]
struct SimFile {
    name: FileName,
    size: u32,
    duration_secs: u32,
}

/// Playback state of the simulated chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipState {
    /// Nothing playing
    Idle,
    /// Track is playing
    Playing(u16),
    /// Track is paused
    Paused(u16),
}

/// Software model of the chip's command interpreter.
#[derive(Debug)]
pub struct SimulatedChip {
    rx: Deque<u8, RX_CAPACITY>,
    input: Vec<u8, INPUT_CAPACITY>,
    files: Vec<SimFile, MAX_FILES>,
    state: ChipState,
    elapsed_secs: u32,
    volume: u8,
    volume_step: u8,
    max_volume: u8,
    desynced: bool,
    timeout_ms: Option<u32>,
    commands: usize,
    volume_history: Vec<u8, HISTORY_CAPACITY>,
}

impl SimulatedChip {
    /// Chip with no files, idle, at raw volume `volume`.
    pub fn new(volume: u8) -> Self {
        Self {
            rx: Deque::new(),
            input: Vec::new(),
            files: Vec::new(),
            state: ChipState::Idle,
            elapsed_secs: 0,
            volume: volume.min(CHIP_MAX_VOLUME),
            volume_step: 1,
            max_volume: CHIP_MAX_VOLUME,
            desynced: false,
            timeout_ms: None,
            commands: 0,
            volume_history: Vec::new(),
        }
    }

    /// Add a file to the directory. The name is listed and matched exactly
    /// as given. Names longer than 11 characters and files beyond the
    /// simulator's capacity are ignored.
    #[must_use]
    pub fn with_file(mut self, name: &str, size: u32, duration_secs: u32) -> Self {
        if let Ok(name) = FileName::try_from(name) {
            let _ = self.files.push(SimFile {
                name,
                size,
                duration_secs,
            });
        }
        self
    }

    /// Change how far one `+`/`-` moves the volume.
    #[must_use]
    pub fn with_volume_step(mut self, step: u8) -> Self {
        self.volume_step = step.max(1);
        self
    }

    /// Change the top of the chip's volume range (legacy firmware: 202).
    #[must_use]
    pub fn with_max_volume(mut self, max_volume: u8) -> Self {
        self.max_volume = max_volume;
        self.volume = self.volume.min(max_volume);
        self
    }

    /// Queue the boot text, as after a reset pulse.
    pub fn power_on(&mut self) {
        self.rx.clear();
        self.input.clear();
        self.state = ChipState::Idle;
        self.desynced = false;
        self.queue(BOOT_TEXT);
    }

    /// Queue bytes as if the chip printed them unprompted.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.queue(bytes);
    }

    /// Let playback run for `secs` seconds. A track that reaches its end
    /// stops.
    pub fn advance(&mut self, secs: u32) {
        if let ChipState::Playing(track) = self.state {
            self.elapsed_secs = self.elapsed_secs.saturating_add(secs);
            let total = self.file(track).map_or(0, |f| f.duration_secs);
            if self.elapsed_secs >= total {
                self.state = ChipState::Idle;
                self.elapsed_secs = 0;
            }
        }
    }

    /// Current raw volume.
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Every raw volume the chip has reported, oldest first.
    pub fn volume_history(&self) -> &[u8] {
        &self.volume_history
    }

    /// Playback state.
    pub fn state(&self) -> ChipState {
        self.state
    }

    /// Number of commands interpreted so far.
    pub fn commands(&self) -> usize {
        self.commands
    }

    /// `true` while the firmware is confused by an unanswered time query.
    pub fn is_desynced(&self) -> bool {
        self.desynced
    }

    /// Last timeout set by the driver, if any.
    pub fn timeout_ms(&self) -> Option<u32> {
        self.timeout_ms
    }

    fn file(&self, track: u16) -> Option<&SimFile> {
        self.files.get(usize::from(track))
    }

    fn queue(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.rx.push_back(b).is_err() {
                break;
            }
        }
    }

    fn reply(&mut self, args: core::fmt::Arguments<'_>) {
        let mut text: String<REPLY_CAPACITY> = String::new();
        if text.write_fmt(args).is_ok() {
            self.queue(text.as_bytes());
        }
    }

    fn receive(&mut self, byte: u8) {
        if self.input.is_empty() {
            match byte {
                b'=' | b'>' | b'q' | b't' | b's' => {
                    self.execute_immediate(byte);
                    return;
                }
                _ => {}
            }
        }
        if byte == b'\n' {
            let line = core::mem::take(&mut self.input);
            self.execute_line(&line);
        } else if self.input.push(byte).is_err() {
            // Firmware drops over-long input.
            self.input.clear();
        }
    }

    fn execute_immediate(&mut self, command: u8) {
        self.commands = self.commands.saturating_add(1);
        match (command, self.state) {
            (b'=', ChipState::Playing(track)) => {
                self.state = ChipState::Paused(track);
                self.queue(b"=");
            }
            (b'>', ChipState::Paused(track)) => {
                self.state = ChipState::Playing(track);
                self.queue(b">");
            }
            (b'q', _) => {
                self.state = ChipState::Idle;
                self.elapsed_secs = 0;
                self.queue(b"q\n");
            }
            (b't', ChipState::Playing(track) | ChipState::Paused(track)) => {
                let total = self.file(track).map_or(0, |f| f.duration_secs);
                let elapsed = self.elapsed_secs;
                self.reply(format_args!("{elapsed:06}{total:06}\n"));
            }
            (b't', ChipState::Idle) => {
                self.desynced = true;
                self.queue(b"0\n");
            }
            (b's', ChipState::Playing(track) | ChipState::Paused(track)) => {
                let total = self.file(track).map_or(0, |f| f.size);
                let played = u64::from(self.elapsed_secs).saturating_mul(1_024);
                let remaining = u64::from(total).saturating_sub(played);
                self.reply(format_args!("{remaining:011}{total:011}\n"));
            }
            _ => {}
        }
    }

    fn execute_line(&mut self, line: &[u8]) {
        if self.desynced {
            // The line after a lost time query is swallowed.
            self.desynced = false;
            self.queue(b"\n");
            return;
        }
        if line.is_empty() {
            return;
        }
        self.commands = self.commands.saturating_add(1);
        match line.split_first() {
            Some((&b'+', _)) => self.nudge_volume(true),
            Some((&b'-', _)) => self.nudge_volume(false),
            Some((&b'L', _)) => self.list(),
            Some((&b'#', digits)) => {
                let track = core::str::from_utf8(digits)
                    .ok()
                    .and_then(|s| s.parse::<u16>().ok());
                self.queue(b"\n");
                match track.filter(|&t| self.file(t).is_some()) {
                    Some(track) => self.start(track),
                    None => self.queue(b"NoFile\n"),
                }
            }
            Some((&b'P', name)) => {
                let track = self
                    .files
                    .iter()
                    .position(|f| f.name.as_bytes() == name)
                    .and_then(|i| u16::try_from(i).ok());
                self.queue(b"\n");
                match track {
                    Some(track) => self.start(track),
                    None => self.queue(b"NoFile\n"),
                }
            }
            _ => {}
        }
    }

    fn nudge_volume(&mut self, up: bool) {
        self.volume = if up {
            self.volume.saturating_add(self.volume_step).min(self.max_volume)
        } else {
            self.volume.saturating_sub(self.volume_step)
        };
        let _ = self.volume_history.push(self.volume);
        let volume = self.volume;
        self.reply(format_args!("{volume}\n"));
    }

    fn list(&mut self) {
        let files = self.files.clone();
        for f in &files {
            let name = f.name.as_str();
            let size = f.size;
            self.reply(format_args!("{name}\t{size:010}\n"));
        }
    }

    fn start(&mut self, track: u16) {
        self.state = ChipState::Playing(track);
        self.elapsed_secs = 0;
        let name = self.file(track).map(|f| f.name.clone()).unwrap_or_default();
        let name = name.as_str();
        self.reply(format_args!("play\t{track}\t{name}\n"));
    }
}

impl SerialTransport for SimulatedChip {
    type Error = Infallible;

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
        for &b in data {
            self.receive(b);
        }
        Ok(())
    }
}
