use std::io::{self, ErrorKind, Read};

use crate::error::SignatureError;

use super::{LF, PNG_SIGNATURE, SUB};

pub const SIGNATURE_LEN: usize = 8;

const CR_OFFSET: usize = 5;
const LF_OFFSET: usize = 7;

/// Which bytes count as line feeds while collecting the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFeedClass {
    /// Only 0x0A.
    #[default]
    Lf,
    /// 0x0A and the 0x1A end-of-file marker.
    LfAndSub,
}

impl LineFeedClass {
    #[inline]
    pub const fn matches(self, byte: u8) -> bool {
        match self {
            Self::Lf => byte == LF,
            Self::LfAndSub => byte == LF || byte == SUB,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignatureOptions {
    pub line_feed_class: LineFeedClass,
    pub min_line_feeds: usize,
    pub max_len: usize,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            line_feed_class: LineFeedClass::Lf,
            min_line_feeds: 2,
            max_len: 32,
        }
    }
}

impl SignatureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_feed_class(mut self, class: LineFeedClass) -> Self {
        self.line_feed_class = class;
        self
    }

    pub fn with_min_line_feeds(mut self, count: usize) -> Self {
        self.min_line_feeds = count.max(1);
        self
    }

    pub fn with_max_len(mut self, len: usize) -> Self {
        self.max_len = len.max(SIGNATURE_LEN);
        self
    }
}

/// The leading bytes of a file, as collected up to the line-feed threshold.
///
/// Eight bytes for an intact PNG; shorter or longer when a text-mode transfer
/// has stripped or inserted carriage returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Signature {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Reads one byte at a time until the configured number of line feeds has
    /// been seen, `max_len` bytes are held, or the stream ends.
    pub fn collect<R: Read + ?Sized>(reader: &mut R, options: &SignatureOptions) -> io::Result<Self> {
        let mut bytes = Vec::with_capacity(SIGNATURE_LEN);
        let mut line_feeds = 0usize;
        let mut byte = [0u8; 1];

        while line_feeds < options.min_line_feeds && bytes.len() < options.max_len {
            match reader.read(&mut byte) {
                Ok(0) => {
                    tracing::debug!(len = bytes.len(), "stream ended inside signature");
                    break;
                }
                Ok(_) => {
                    if options.line_feed_class.matches(byte[0]) {
                        line_feeds += 1;
                    }
                    bytes.push(byte[0]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(Self { bytes })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn verify(&self) -> Result<(), SignatureError> {
        validate_signature(&self.bytes)
    }
}

/// Checks collected signature bytes, classifying newline transcoding damage.
///
/// A DOS-to-Unix pass strips the CR at offset 4, so the second LF arrives one
/// byte early and the header comes up short. A Unix-to-DOS pass inserts a CR
/// before each LF, pushing the final LF past offset 7.
pub fn validate_signature(bytes: &[u8]) -> Result<(), SignatureError> {
    let magic_ok = bytes.first() == Some(&PNG_SIGNATURE[0]);
    let tag_ok = bytes.get(1..4) == Some(&PNG_SIGNATURE[1..4]);

    if !magic_ok && !tag_ok {
        return Err(SignatureError::NotPng);
    }

    if bytes.len() < SIGNATURE_LEN {
        return match bytes.get(CR_OFFSET) {
            Some(_) => Err(SignatureError::DosToUnixConversion { len: bytes.len() }),
            None => Err(SignatureError::InvalidHeaderLength { len: bytes.len() }),
        };
    }

    if bytes[LF_OFFSET] != LF {
        return Err(SignatureError::UnixToDosConversion {
            found: bytes[LF_OFFSET],
        });
    }

    Ok(())
}
