//! Driver error types

use crate::volume::ScaleError;

/// A chip reply that does not match what the command expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseError {
    /// Nothing arrived before the read timeout.
    #[error("no response before timeout")]
    NoResponse,
    /// A fixed-width reply had the wrong length.
    #[error("expected a {expected}-byte reply, got {actual} bytes")]
    UnexpectedLength {
        /// Length the command defines
        expected: usize,
        /// Length actually received
        actual: usize,
    },
    /// A single-character acknowledgement did not echo the command.
    #[error("expected echo {expected:#04x}, got {actual:#04x}")]
    UnexpectedEcho {
        /// Command byte
        expected: u8,
        /// First byte of the reply
        actual: u8,
    },
    /// A play reply did not contain the `play` marker.
    #[error("reply is missing the play marker")]
    MissingMarker,
    /// The chip started a different track than the one requested.
    #[error("requested track {requested}, chip is playing {playing}")]
    TrackMismatch {
        /// Track number sent
        requested: u16,
        /// Track number echoed
        playing: u16,
    },
    /// A numeric field contained something other than decimal digits.
    #[error("malformed number in reply")]
    InvalidNumber,
    /// A text field was not printable ASCII.
    #[error("malformed text in reply")]
    InvalidText,
}

/// Error returned by soundboard operations.
///
/// `E` is the error type of the serial transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The serial transport failed.
    #[error("serial transport error: {0:?}")]
    Transport(E),
    /// The reset line could not be driven.
    #[error("reset line could not be driven")]
    ResetLine,
    /// Persistent storage could not be read or written.
    #[error("persistent storage access failed")]
    Storage,
    /// The chip replied, but not as the protocol defines.
    #[error(transparent)]
    Response(#[from] ResponseError),
    /// A file name cannot be sent to the chip.
    #[error("file name must be 1 to 11 printable characters")]
    InvalidName,
    /// The power-on banner did not identify a soundboard.
    #[error("chip banner not recognised")]
    UnrecognisedBanner,
    /// The volume configuration is unusable.
    #[error(transparent)]
    InvalidScale(#[from] ScaleError),
}

impl<E> Error<E> {
    /// `true` when the chip simply did not answer in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Response(ResponseError::NoResponse))
    }
}
