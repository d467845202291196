//! Wire protocol of the soundboard UART
//!
//! Commands are short ASCII strings. Line commands end in `\n`; pause,
//! resume, stop, track time and file size are single bytes with no
//! terminator. Replies are `\n`-terminated lines, sometimes followed by a
//! stray `\r`.
//!
//! | Command        | Bytes        | Reply                                  |
//! |----------------|--------------|----------------------------------------|
//! | list files     | `L\n`        | one line per file, then silence        |
//! | play by number | `#<n>\n`     | echo line, then `play<sep><n>...`      |
//! | play by name   | `P<name>\n`  | echo line, then `play<sep><n>...`      |
//! | pause          | `=`          | `=`                                    |
//! | resume         | `>`          | `>`                                    |
//! | stop           | `q`          | `q`                                    |
//! | track time     | `t`          | `%06d%06d` current, total seconds      |
//! | file size      | `s`          | `%011d%011d` remaining, total bytes    |
//! | volume up      | `+\n`        | new raw volume, decimal                |
//! | volume down    | `-\n`        | new raw volume, decimal                |
//!
//! Everything here is pure: parsers take the bytes of one line and never
//! touch the transport.

use core::fmt::Write as _;

use crate::error::ResponseError;

/// Longest reply line the driver keeps.
pub const LINE_BUFFER_CAPACITY: usize = 80;
/// Number of directory entries the driver can remember.
pub const FILE_TABLE_CAPACITY: usize = 25;
/// 8.3 names without the dot: 8 + 3.
pub const FILE_NAME_LEN: usize = 11;
/// Offset of the size field in a directory line (name, one separator).
pub const FILE_SIZE_OFFSET: usize = 12;
/// Digits of the size field in a directory line.
pub const FILE_SIZE_WIDTH: usize = 10;
/// Length of a track time reply.
pub const TRACK_TIME_LEN: usize = 12;
/// Digits per track time field.
pub const TRACK_TIME_FIELD_WIDTH: usize = 6;
/// Length of a file size reply.
pub const FILE_SIZE_LEN: usize = 22;
/// Digits per file size field.
pub const FILE_SIZE_FIELD_WIDTH: usize = 11;
/// Marker the chip prints when a track starts.
pub const PLAY_MARKER: &[u8] = b"play";
/// Room for the longest command: `P` + name + `\n`.
pub const COMMAND_CAPACITY: usize = FILE_NAME_LEN + 2;

/// Encoded command bytes.
pub type CommandBytes = heapless::Vec<u8, COMMAND_CAPACITY>;
/// File name as reported by the chip.
pub type FileName = heapless::String<FILE_NAME_LEN>;

/// One soundboard command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `L\n`
    ListFiles,
    /// `#<n>\n`
    PlayNumber(u16),
    /// `P<name>\n`
    PlayName(&'a str),
    /// `=`
    Pause,
    /// `>`
    Resume,
    /// `q`
    Stop,
    /// `t`
    TrackTime,
    /// `s`
    FileSize,
    /// `+\n`
    VolumeUp,
    /// `-\n`
    VolumeDown,
    /// Bare `\n`, used to resynchronise after a short reply.
    Resync,
}

impl Command<'_> {
    /// Encode for the wire.
    ///
    /// Returns `None` only for a [`Command::PlayName`] whose name is not
    /// [valid](is_valid_file_name).
    pub fn encode(&self) -> Option<CommandBytes> {
        let mut out = CommandBytes::new();
        match self {
            Self::ListFiles => out.extend_from_slice(b"L\n").ok()?,
            Self::PlayNumber(n) => {
                let mut text = heapless::String::<COMMAND_CAPACITY>::new();
                writeln!(text, "#{n}").ok()?;
                out.extend_from_slice(text.as_bytes()).ok()?;
            }
            Self::PlayName(name) => {
                if !is_valid_file_name(name) {
                    return None;
                }
                out.push(b'P').ok()?;
                out.extend_from_slice(name.as_bytes()).ok()?;
                out.push(b'\n').ok()?;
            }
            Self::Pause => out.push(b'=').ok()?,
            Self::Resume => out.push(b'>').ok()?,
            Self::Stop => out.push(b'q').ok()?,
            Self::TrackTime => out.push(b't').ok()?,
            Self::FileSize => out.push(b's').ok()?,
            Self::VolumeUp => out.extend_from_slice(b"+\n").ok()?,
            Self::VolumeDown => out.extend_from_slice(b"-\n").ok()?,
            Self::Resync => out.push(b'\n').ok()?,
        }
        Some(out)
    }

    /// Byte the chip echoes to acknowledge a transport control command.
    pub fn acknowledgement(&self) -> Option<u8> {
        match self {
            Self::Pause => Some(b'='),
            Self::Resume => Some(b'>'),
            Self::Stop => Some(b'q'),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ListFiles => "list files",
            Self::PlayNumber(_) => "play number",
            Self::PlayName(_) => "play name",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::TrackTime => "track time",
            Self::FileSize => "file size",
            Self::VolumeUp => "volume up",
            Self::VolumeDown => "volume down",
            Self::Resync => "resync",
        }
    }
}

/// `true` if `name` can be sent with [`Command::PlayName`]: 1 to 11
/// printable ASCII characters.
pub fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= FILE_NAME_LEN
        && name.bytes().all(|b| b.is_ascii_graphic() || b == b' ')
}

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileEntry {
    /// 8.3 name without the dot, exactly as listed (padding included), so
    /// it can be handed straight back to `P<name>`
    pub name: FileName,
    /// Size in bytes
    pub size: u32,
}

#[cfg(feature = "defmt")]
impl defmt::Format for FileEntry {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{=str} ({=u32} bytes)", self.name.as_str(), self.size);
    }
}

/// Playback position of the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackTime {
    /// Seconds played
    pub current_secs: u32,
    /// Track length in seconds
    pub total_secs: u32,
}

/// Byte position in the current file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FileSize {
    /// Bytes not yet played
    pub remaining: u64,
    /// File size in bytes
    pub total: u64,
}

/// Parse one directory line: `<name><sep><size>`.
///
/// The name is everything before the first tab (within the first
/// [`FILE_SIZE_OFFSET`] bytes), kept as received. Lines without a tab fall
/// back to the fixed layout: name in bytes `0..11`, size from byte 12. The
/// size is the leading run of digits, at most [`FILE_SIZE_WIDTH`] of them.
pub fn parse_file_entry(line: &[u8]) -> Result<FileEntry, ResponseError> {
    let head = line.get(..FILE_SIZE_OFFSET.min(line.len())).unwrap_or(line);
    let (raw_name, raw_size) = match head.iter().position(|&b| b == b'\t') {
        Some(tab) => (
            line.get(..tab).unwrap_or_default(),
            line.get(tab.saturating_add(1)..).unwrap_or_default(),
        ),
        None => (
            line.get(..FILE_NAME_LEN.min(line.len())).unwrap_or_default(),
            line.get(FILE_SIZE_OFFSET..).unwrap_or_default(),
        ),
    };

    if trim_end_spaces(raw_name).is_empty() || raw_name.len() > FILE_NAME_LEN {
        return Err(ResponseError::InvalidText);
    }
    let name = core::str::from_utf8(raw_name)
        .ok()
        .filter(|s| is_valid_file_name(s))
        .ok_or(ResponseError::InvalidText)?;
    let name = FileName::try_from(name).map_err(|_| ResponseError::InvalidText)?;

    let digits = leading_digits(raw_size);
    let digits = digits.get(..FILE_SIZE_WIDTH.min(digits.len())).unwrap_or(digits);
    let size = parse_digits(digits)?;
    let size = u32::try_from(size).map_err(|_| ResponseError::InvalidNumber)?;
    Ok(FileEntry { name, size })
}

/// Parse a track time reply: exactly [`TRACK_TIME_LEN`] digits.
pub fn parse_track_time(line: &[u8]) -> Result<TrackTime, ResponseError> {
    if line.len() != TRACK_TIME_LEN {
        return Err(ResponseError::UnexpectedLength {
            expected: TRACK_TIME_LEN,
            actual: line.len(),
        });
    }
    let (current, total) = line.split_at(TRACK_TIME_FIELD_WIDTH);
    let current_secs = u32::try_from(parse_digits(current)?).map_err(|_| ResponseError::InvalidNumber)?;
    let total_secs = u32::try_from(parse_digits(total)?).map_err(|_| ResponseError::InvalidNumber)?;
    Ok(TrackTime {
        current_secs,
        total_secs,
    })
}

/// Parse a file size reply: exactly [`FILE_SIZE_LEN`] digits.
pub fn parse_file_size(line: &[u8]) -> Result<FileSize, ResponseError> {
    if line.len() != FILE_SIZE_LEN {
        return Err(ResponseError::UnexpectedLength {
            expected: FILE_SIZE_LEN,
            actual: line.len(),
        });
    }
    let (remaining, total) = line.split_at(FILE_SIZE_FIELD_WIDTH);
    Ok(FileSize {
        remaining: parse_digits(remaining)?,
        total: parse_digits(total)?,
    })
}

/// `true` if `line` contains the play marker.
pub fn has_play_marker(line: &[u8]) -> bool {
    find(line, PLAY_MARKER).is_some()
}

/// Track number from a play reply such as `play7`, `play 7` or
/// `play\t7\tNAME`.
pub fn parse_play_reply(line: &[u8]) -> Result<u16, ResponseError> {
    let start = find(line, PLAY_MARKER).ok_or(ResponseError::MissingMarker)?;
    let rest = line
        .get(start.saturating_add(PLAY_MARKER.len())..)
        .unwrap_or_default();
    let first_digit = rest
        .iter()
        .position(u8::is_ascii_digit)
        .ok_or(ResponseError::InvalidNumber)?;
    let digits = leading_digits(rest.get(first_digit..).unwrap_or_default());
    let number = parse_digits(digits)?;
    u16::try_from(number).map_err(|_| ResponseError::InvalidNumber)
}

/// Raw volume from a `+`/`-` reply: leading digits after optional spaces.
pub fn parse_volume(line: &[u8]) -> Result<u8, ResponseError> {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or(ResponseError::NoResponse)?;
    let digits = leading_digits(line.get(start..).unwrap_or_default());
    let volume = parse_digits(digits)?;
    u8::try_from(volume).map_err(|_| ResponseError::InvalidNumber)
}

/// Check a single-character acknowledgement.
pub fn check_acknowledgement(line: &[u8], expected: u8) -> Result<(), ResponseError> {
    match line.first() {
        None => Err(ResponseError::NoResponse),
        Some(&actual) if actual == expected => Ok(()),
        Some(&actual) => Err(ResponseError::UnexpectedEcho { expected, actual }),
    }
}

/// Decimal value of `digits`. Empty input or any non-digit is an error.
fn parse_digits(digits: &[u8]) -> Result<u64, ResponseError> {
    if digits.is_empty() {
        return Err(ResponseError::InvalidNumber);
    }
    digits.iter().try_fold(0u64, |acc, &b| {
        if !b.is_ascii_digit() {
            return Err(ResponseError::InvalidNumber);
        }
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b.wrapping_sub(b'0'))))
            .ok_or(ResponseError::InvalidNumber)
    })
}

fn leading_digits(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(bytes.len());
    bytes.get(..end).unwrap_or(bytes)
}

fn trim_end_spaces(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |i| i.saturating_add(1));
    bytes.get(..end).unwrap_or(bytes)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
