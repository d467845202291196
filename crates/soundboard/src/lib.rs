//! Driver for UART-controlled VS1000 soundboard chips
//!
//! The chip plays audio files from its own storage and is driven over a
//! 9600 baud line-oriented ASCII protocol: list files, play by number or
//! name, pause/resume/stop, query track time and file size, and nudge the
//! volume up or down one step at a time.
//!
//! # Architecture
//!
//! ```text
//! Application
//!     ↓
//! Soundboard session   (request discipline, volume walk, persistence)
//!     ↓              ↘
//! protocol + line      VolumeScale (raw volume ↔ level)
//!     ↓
//! platform::SerialTransport / NvStorage, embedded-hal reset pin + delay
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut board = Soundboard::with_persistence(uart, reset_pin, delay, eeprom, 0);
//! board.begin(SoundboardConfig::default())?;
//! board.reset()?;
//! let files = board.list_files_cached()?;
//! board.play_track(0)?;
//! board.cycle_volume_level()?;
//! ```
//!
//! # Features
//!
//! - `defmt`: log through `defmt` and derive `defmt::Format` (firmware)
//! - `tracing`: log through `tracing` (host)

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod config;
pub mod error;
pub mod line;
pub mod protocol;
pub mod session;
pub mod volume;

pub use config::{BannerPolicy, SoundboardConfig};
pub use error::{Error, ResponseError};
pub use protocol::{FileEntry, FileSize, TrackTime};
pub use session::{FileTable, Soundboard};
pub use volume::{ScaleError, VolumeConfig, VolumeScale};
