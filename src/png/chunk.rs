use std::fmt;

use serde::{Serialize, Serializer};

/// Four-byte chunk type code.
///
/// Tags come straight off the wire and are not guaranteed to be ASCII, so the
/// raw bytes are kept and only rendered as text for display.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkTag(pub [u8; 4]);

impl ChunkTag {
    #[inline]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for ChunkTag {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl From<&[u8; 4]> for ChunkTag {
    fn from(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }
}

impl PartialEq<[u8; 4]> for ChunkTag {
    fn eq(&self, other: &[u8; 4]) -> bool {
        &self.0 == other
    }
}

impl PartialEq<&[u8; 4]> for ChunkTag {
    fn eq(&self, other: &&[u8; 4]) -> bool {
        &self.0 == *other
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkTag({self})")
    }
}

impl Serialize for ChunkTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One framed unit from the chunk stream: length, tag, payload, CRC.
///
/// `length` is the value declared on the wire. The decoder only builds chunks
/// whose payload matches it, unless truncated chunks are explicitly kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub length: u32,
    pub tag: ChunkTag,
    pub payload: Vec<u8>,
    pub crc: u32,
    pub offset: u64,
}

impl Chunk {
    /// Builds a well-formed chunk with the length and CRC derived from `payload`.
    pub fn new(tag: impl Into<ChunkTag>, payload: Vec<u8>) -> Self {
        let crc = crc32fast::hash(&payload);
        Self {
            length: payload.len() as u32,
            tag: tag.into(),
            payload,
            crc,
            offset: 0,
        }
    }

    #[inline]
    pub const fn total_size(&self) -> u64 {
        4 + 4 + self.length as u64 + 4
    }

    #[inline]
    pub const fn data_offset(&self) -> u64 {
        self.offset + 8
    }

    /// Serializes the chunk in wire order. Used for building fixtures.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.payload.len());
        out.extend_from_slice(&self.length.to_be_bytes());
        out.extend_from_slice(self.tag.as_bytes());
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.crc.to_be_bytes());
        out
    }
}
