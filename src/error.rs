use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors produced by archive and RefPack operations.
#[derive(Debug)]
pub enum Error {
    /// No entry with this name exists (and none is pending addition).
    NotFound(String),
    /// An entry with this name already exists, committed or pending.
    AlreadyExists(String),
    /// A name is not representable in the archive's index (contains `/`, or a
    /// character outside Latin-1).
    InvalidName(String),
    /// The fixed 16-byte archive header is shorter than the input.
    TruncatedHeader,
    /// The index table ends before `entry_count` entries have been read.
    TruncatedIndex,
    /// An index entry's name has no null terminator before the input ends.
    TruncatedName,
    /// Repacking would produce an archive larger than `u32::MAX` bytes.
    MaxSize,
    /// A decoded RefPack stream did not produce the declared uncompressed size.
    SizeMismatch { expected: usize, actual: usize },
    /// A RefPack stream referenced data outside the decoded output, or ended
    /// mid-opcode.
    Corrupt(&'static str),
    /// An I/O operation failed, optionally naming the path involved.
    Io {
        path: Option<PathBuf>,
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: Some(path.into()),
            source,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(name) => write!(f, "file '{name}' does not exist"),
            Error::AlreadyExists(name) => write!(f, "file '{name}' already exists"),
            Error::InvalidName(name) => write!(
                f,
                "file name '{name}' is not valid (must not contain '/' and must be Latin-1 representable)"
            ),
            Error::TruncatedHeader => write!(f, "archive header is truncated"),
            Error::TruncatedIndex => write!(f, "archive index ends before all entries are read"),
            Error::TruncatedName => write!(f, "archive entry name is missing its null terminator"),
            Error::MaxSize => write!(f, "archive would exceed the maximum size of {} bytes", u32::MAX),
            Error::SizeMismatch { expected, actual } => write!(
                f,
                "refpack decode produced {actual} bytes, expected {expected}"
            ),
            Error::Corrupt(reason) => write!(f, "refpack stream is corrupt: {reason}"),
            Error::Io { path: Some(path), source } => write!(f, "{}: {source}", path.display()),
            Error::Io { path: None, source } => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
