//! Error taxonomy for the KANZ compression pipeline.
//!
//! Every failure surfaced by the library carries an [`ErrorKind`] with a
//! stable numeric code. The codes double as process exit codes for the
//! `kanzi` binary and must not be renumbered between releases.

use core::fmt;

/// Stable error codes for stream and file operations.
///
/// The discriminants are part of the public contract: scripts match on the
/// exit code of the CLI, and worker tasks exchange kinds across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorKind {
    /// A required parameter is missing from the invocation.
    MissingParam = 1,
    /// Block size outside `[1024, 2^30]` or a block frame larger than allowed.
    BlockSize = 2,
    /// Unknown entropy codec or transform identifier.
    InvalidCodec = 3,
    /// Compressor construction failed.
    CreateCompressor = 4,
    /// Decompressor construction failed.
    CreateDecompressor = 5,
    /// Output path refers to a directory.
    OutputIsDir = 6,
    /// Output exists and overwrite was not requested.
    OverwriteFile = 7,
    /// Input cannot be opened.
    OpenFile = 8,
    /// Underlying read failure (includes truncated streams).
    ReadFile = 9,
    /// Underlying write failure.
    WriteFile = 10,
    /// A transform or entropy stage failed on a block.
    ProcessBlock = 11,
    /// Bitstream construction failed.
    CreateBitstream = 12,
    /// Magic number or header field mismatch.
    InvalidFile = 13,
    /// Stream version newer than this implementation supports.
    StreamVersion = 14,
    /// Stream object construction failed.
    CreateStream = 15,
    /// A parameter value is out of range.
    InvalidParam = 16,
    /// Header CRC or block checksum mismatch.
    CrcCheck = 17,
    /// Output file cannot be created.
    CreateFile = 18,
    /// Anything not mapped above.
    Unknown = 127,
}

impl ErrorKind {
    /// Numeric code, stable across versions.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Canonical name, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::MissingParam => "ERR_MISSING_PARAM",
            ErrorKind::BlockSize => "ERR_BLOCK_SIZE",
            ErrorKind::InvalidCodec => "ERR_INVALID_CODEC",
            ErrorKind::CreateCompressor => "ERR_CREATE_COMPRESSOR",
            ErrorKind::CreateDecompressor => "ERR_CREATE_DECOMPRESSOR",
            ErrorKind::OutputIsDir => "ERR_OUTPUT_IS_DIR",
            ErrorKind::OverwriteFile => "ERR_OVERWRITE_FILE",
            ErrorKind::OpenFile => "ERR_OPEN_FILE",
            ErrorKind::ReadFile => "ERR_READ_FILE",
            ErrorKind::WriteFile => "ERR_WRITE_FILE",
            ErrorKind::ProcessBlock => "ERR_PROCESS_BLOCK",
            ErrorKind::CreateBitstream => "ERR_CREATE_BITSTREAM",
            ErrorKind::InvalidFile => "ERR_INVALID_FILE",
            ErrorKind::StreamVersion => "ERR_STREAM_VERSION",
            ErrorKind::CreateStream => "ERR_CREATE_STREAM",
            ErrorKind::InvalidParam => "ERR_INVALID_PARAM",
            ErrorKind::CrcCheck => "ERR_CRC_CHECK",
            ErrorKind::CreateFile => "ERR_CREATE_FILE",
            ErrorKind::Unknown => "ERR_UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Library error: a kind plus a human-readable message.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Error { kind, msg: msg.into() }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.msg.is_empty() {
            write!(f, "{}", self.kind.name())
        } else {
            write!(f, "{}: {}", self.kind.name(), self.msg)
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind, msg: String::new() }
    }
}

/// Convenience alias used throughout the stream pipeline.
pub type Result<T> = std::result::Result<T, Error>;
