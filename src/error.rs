use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::png::ChunkTag;

/// Flat classification of every failure the checker can report.
///
/// The typed errors below carry diagnostic fields; `ErrorKind` is what ends up
/// in serialized reports and what callers match on when they only care about
/// the class of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotPng,
    InvalidHeaderLength,
    DosToUnixConversion,
    UnixToDosConversion,
    TruncatedRecord,
    MissingBytes,
    CrcMismatch,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotPng => "not a png file",
            Self::InvalidHeaderLength => "invalid header length",
            Self::DosToUnixConversion => "dos to unix conversion",
            Self::UnixToDosConversion => "unix to dos conversion",
            Self::TruncatedRecord => "truncated record",
            Self::MissingBytes => "missing bytes",
            Self::CrcMismatch => "crc mismatch",
            Self::Io => "i/o error",
        };
        f.write_str(name)
    }
}

/// Signature damage detected by [`validate_signature`](crate::png::validate_signature).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("not a png file")]
    NotPng,

    #[error("invalid header length: {len} bytes")]
    InvalidHeaderLength { len: usize },

    #[error("dos to unix conversion: header is {len} bytes, a carriage return was stripped")]
    DosToUnixConversion { len: usize },

    #[error("unix to dos conversion: expected 0x0a at offset 7, found {found:#04x}")]
    UnixToDosConversion { found: u8 },
}

impl SignatureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotPng => ErrorKind::NotPng,
            Self::InvalidHeaderLength { .. } => ErrorKind::InvalidHeaderLength,
            Self::DosToUnixConversion { .. } => ErrorKind::DosToUnixConversion,
            Self::UnixToDosConversion { .. } => ErrorKind::UnixToDosConversion,
        }
    }
}

/// Which part of a chunk frame the stream ran out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Length,
    Tag,
    Payload,
    Checksum,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Length => "length",
            Self::Tag => "type tag",
            Self::Payload => "payload",
            Self::Checksum => "checksum",
        })
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(
        "truncated chunk at offset {offset}: {field} needs {expected} bytes, stream held {available}"
    )]
    TruncatedRecord {
        offset: u64,
        tag: Option<ChunkTag>,
        field: RecordField,
        expected: u64,
        available: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TruncatedRecord { .. } => ErrorKind::TruncatedRecord,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Per-chunk integrity failure reported by [`verify_record`](crate::png::verify_record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("missing bytes: declared {declared}, payload holds {actual}")]
    MissingBytes { declared: u32, actual: usize },

    #[error("crc mismatch: stored {stored:08x}, computed {computed:08x}")]
    CrcMismatch { stored: u32, computed: u32 },
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingBytes { .. } => ErrorKind::MissingBytes,
            Self::CrcMismatch { .. } => ErrorKind::CrcMismatch,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
