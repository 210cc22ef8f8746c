//! Chunk stream decoding.
//!
//! The decoder walks a PNG byte stream one frame at a time: 4-byte big-endian
//! length, 4-byte tag, payload, 4-byte CRC. It never validates CRCs itself;
//! that is left to [`verify_record`](super::verify_record) so a damaged chunk
//! still shows up in the decoded map.

use std::io::{self, BufReader, ErrorKind, Read};

use indexmap::IndexMap;

use super::chunk::{Chunk, ChunkTag};
use super::signature::{Signature, SignatureOptions};
use super::IEND;
use crate::error::{DecodeError, RecordField, Result};

/// What to do when the stream ends inside a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Fail with [`DecodeError::TruncatedRecord`].
    #[default]
    Reject,
    /// Keep the short chunk (CRC read as zero) and end decoding. A stream that
    /// ends inside the CRC field is still rejected.
    Keep,
}

#[derive(Debug, Clone)]
pub struct DecodeOptions {
    pub signature: SignatureOptions,
    pub truncation: TruncationPolicy,
    pub stop_at_terminal: bool,
    pub terminal_tag: ChunkTag,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            signature: SignatureOptions::default(),
            truncation: TruncationPolicy::Reject,
            stop_at_terminal: false,
            terminal_tag: IEND,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signature(mut self, signature: SignatureOptions) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_truncation(mut self, policy: TruncationPolicy) -> Self {
        self.truncation = policy;
        self
    }

    pub fn stop_at_terminal(mut self, enabled: bool) -> Self {
        self.stop_at_terminal = enabled;
        self
    }

    pub fn with_terminal_tag(mut self, tag: impl Into<ChunkTag>) -> Self {
        self.terminal_tag = tag.into();
        self
    }
}

/// Chunks grouped by tag.
///
/// Tags iterate in order of first appearance and chunks within a tag in stream
/// order, so two decodes of the same bytes always iterate identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMap {
    inner: IndexMap<ChunkTag, Vec<Chunk>>,
}

impl ChunkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Chunk) {
        self.inner.entry(chunk.tag).or_default().push(chunk);
    }

    pub fn get(&self, tag: impl Into<ChunkTag>) -> Option<&[Chunk]> {
        self.inner.get(&tag.into()).map(Vec::as_slice)
    }

    pub fn contains(&self, tag: impl Into<ChunkTag>) -> bool {
        self.inner.contains_key(&tag.into())
    }

    pub fn tags(&self) -> impl Iterator<Item = ChunkTag> + '_ {
        self.inner.keys().copied()
    }

    /// Every chunk with its tag and its index within that tag.
    pub fn records(&self) -> impl Iterator<Item = (ChunkTag, usize, &Chunk)> {
        self.inner.iter().flat_map(|(tag, chunks)| {
            chunks
                .iter()
                .enumerate()
                .map(move |(index, chunk)| (*tag, index, chunk))
        })
    }

    /// Total number of chunks across all tags.
    pub fn len(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    pub fn tag_count(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedContainer {
    pub signature: Signature,
    pub chunks: ChunkMap,
}

/// Result of a decode that keeps whatever was framed before a fault.
#[derive(Debug)]
pub struct PartialDecode {
    pub container: DecodedContainer,
    pub error: Option<DecodeError>,
    /// False when the stream failed before the signature was read; the
    /// container's signature is then empty rather than collected.
    pub signature_collected: bool,
}

impl PartialDecode {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<DecodedContainer> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.container),
        }
    }
}

/// Streaming decoder over any reader.
///
/// Call [`read_signature`](Self::read_signature) before pulling chunks with
/// [`next_chunk`](Self::next_chunk) or the `Iterator` impl; [`decode`](Self::decode)
/// and [`decode_partial`](Self::decode_partial) do both.
pub struct ChunkStreamDecoder<R: Read> {
    reader: BufReader<R>,
    options: DecodeOptions,
    offset: u64,
    finished: bool,
}

impl<R: Read> ChunkStreamDecoder<R> {
    pub fn new(reader: R, options: DecodeOptions) -> Self {
        Self {
            reader: BufReader::new(reader),
            options,
            offset: 0,
            finished: false,
        }
    }

    pub fn read_signature(&mut self) -> Result<Signature> {
        let signature = Signature::collect(&mut self.reader, &self.options.signature)?;
        self.offset += signature.len() as u64;
        Ok(signature)
    }

    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.finished {
            return Ok(None);
        }

        let next = self.frame_chunk();
        if !matches!(next, Ok(Some(_))) {
            self.finished = true;
        }
        next
    }

    pub fn decode(mut self) -> Result<DecodedContainer> {
        let signature = self.read_signature()?;
        let mut chunks = ChunkMap::new();

        while let Some(chunk) = self.next_chunk()? {
            chunks.push(chunk);
        }

        Ok(DecodedContainer { signature, chunks })
    }

    pub fn decode_partial(mut self) -> PartialDecode {
        let mut container = DecodedContainer::default();

        match self.read_signature() {
            Ok(signature) => container.signature = signature,
            Err(err) => {
                tracing::warn!(error = %err, "stream failed while reading signature");
                return PartialDecode {
                    container,
                    error: Some(err),
                    signature_collected: false,
                };
            }
        }

        loop {
            match self.next_chunk() {
                Ok(Some(chunk)) => container.chunks.push(chunk),
                Ok(None) => {
                    return PartialDecode {
                        container,
                        error: None,
                        signature_collected: true,
                    };
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        decoded = container.chunks.len(),
                        "decode aborted, keeping earlier chunks"
                    );
                    return PartialDecode {
                        container,
                        error: Some(err),
                        signature_collected: true,
                    };
                }
            }
        }
    }

    fn frame_chunk(&mut self) -> Result<Option<Chunk>> {
        let start = self.offset;

        let mut length_buf = [0u8; 4];
        match self.fill(&mut length_buf)? {
            0 => return Ok(None),
            4 => {}
            n => return Err(truncated(start, None, RecordField::Length, 4, n as u64)),
        }
        let length = u32::from_be_bytes(length_buf);

        let mut tag_buf = [0u8; 4];
        match self.fill(&mut tag_buf)? {
            0 => {
                tracing::warn!(offset = start, length, "stream ended after a chunk length field");
                return Ok(None);
            }
            4 => {}
            n => return Err(truncated(start, None, RecordField::Tag, 4, n as u64)),
        }
        let tag = ChunkTag::new(tag_buf);

        // Grow with the bytes actually present instead of trusting `length`.
        let mut payload = Vec::new();
        let got = Read::by_ref(&mut self.reader)
            .take(u64::from(length))
            .read_to_end(&mut payload)? as u64;
        self.offset += got;

        if got < u64::from(length) {
            let chunk = Chunk {
                length,
                tag,
                payload,
                crc: 0,
                offset: start,
            };
            return self.short_payload(chunk, got);
        }

        // A complete payload with a cut-off CRC cannot be told apart from
        // payload damage once kept, so it is always a framing error.
        let mut crc_buf = [0u8; 4];
        let got = self.fill(&mut crc_buf)?;
        if got < 4 {
            return Err(truncated(
                start,
                Some(tag),
                RecordField::Checksum,
                4,
                got as u64,
            ));
        }

        let chunk = Chunk {
            length,
            tag,
            payload,
            crc: u32::from_be_bytes(crc_buf),
            offset: start,
        };

        tracing::debug!(tag = %tag, length, offset = start, "decoded chunk");

        if self.options.stop_at_terminal && tag == self.options.terminal_tag {
            tracing::debug!(tag = %tag, offset = self.offset, "terminal chunk reached, stopping");
            self.finished = true;
        }

        Ok(Some(chunk))
    }

    fn short_payload(&mut self, chunk: Chunk, available: u64) -> Result<Option<Chunk>> {
        let expected = u64::from(chunk.length);
        match self.options.truncation {
            TruncationPolicy::Reject => Err(truncated(
                chunk.offset,
                Some(chunk.tag),
                RecordField::Payload,
                expected,
                available,
            )),
            TruncationPolicy::Keep => {
                tracing::warn!(
                    tag = %chunk.tag,
                    offset = chunk.offset,
                    expected,
                    available,
                    "keeping chunk with truncated payload"
                );
                self.finished = true;
                Ok(Some(chunk))
            }
        }
    }

    /// Reads until `buf` is full or the stream ends, returning the byte count.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }
}

impl<R: Read> Iterator for ChunkStreamDecoder<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

fn truncated(
    offset: u64,
    tag: Option<ChunkTag>,
    field: RecordField,
    expected: u64,
    available: u64,
) -> DecodeError {
    DecodeError::TruncatedRecord {
        offset,
        tag,
        field,
        expected,
        available,
    }
}

pub fn decode<R: Read>(reader: R) -> Result<DecodedContainer> {
    ChunkStreamDecoder::new(reader, DecodeOptions::default()).decode()
}

pub fn decode_with<R: Read>(reader: R, options: &DecodeOptions) -> Result<DecodedContainer> {
    ChunkStreamDecoder::new(reader, options.clone()).decode()
}
