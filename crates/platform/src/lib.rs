//! Collaborator contracts for the soundboard driver
//!
//! This crate defines the hardware-facing traits the driver is written
//! against, adapters from the embedded ecosystem traits, and host mocks.
//!
//! # Architecture Layers
//!
//! ```text
//! Application (menu loop, buttons, ...)
//!         ↓
//! soundboard driver (session + volume mapping)
//!         ↓
//! Platform contracts (this crate)
//!         ↓
//! HAL (embedded-io UART, embedded-storage EEPROM, embedded-hal GPIO/delay)
//! ```
//!
//! # Contracts
//!
//! - [`SerialTransport`] - byte stream with read timeout and peek
//! - [`NvStorage`] - integer slot storage for persistent settings
//!
//! The reset line and delays are plain `embedded_hal` traits
//! (`digital::OutputPin`, `delay::DelayNs`) and need no wrapper here.
//!
//! # Features
//!
//! - `std`: Enable the [`mocks`] module outside of this crate's own tests
//! - `defmt`: Derive `defmt::Format` on public value types

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
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod mocks;
pub mod peripheral;
pub mod storage;
pub mod uart;

pub use peripheral::SerialTransport;
pub use storage::{NoStorage, NvStorage, StorageSlot};
pub use uart::UartTransport;
