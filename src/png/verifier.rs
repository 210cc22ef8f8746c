use rayon::prelude::*;
use serde::Serialize;

use super::chunk::{Chunk, ChunkTag};
use super::decoder::DecodedContainer;
use super::IEND;
use crate::error::{ErrorKind, VerifyError};

/// Checks one chunk's declared length and CRC against its payload.
///
/// Returns the computed CRC alongside the outcome. A length mismatch makes the
/// CRC meaningless, so it comes back as zero in that case.
pub fn verify_record(chunk: &Chunk) -> (u32, Result<(), VerifyError>) {
    if chunk.length as usize != chunk.payload.len() {
        return (
            0,
            Err(VerifyError::MissingBytes {
                declared: chunk.length,
                actual: chunk.payload.len(),
            }),
        );
    }

    let computed = crc32fast::hash(&chunk.payload);
    if computed != chunk.crc {
        return (
            computed,
            Err(VerifyError::CrcMismatch {
                stored: chunk.crc,
                computed,
            }),
        );
    }

    (computed, Ok(()))
}

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub stop_at_terminal: bool,
    pub terminal_tag: ChunkTag,
    pub parallel: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            stop_at_terminal: true,
            terminal_tag: IEND,
            parallel: false,
        }
    }
}

impl VerifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_at_terminal(mut self, enabled: bool) -> Self {
        self.stop_at_terminal = enabled;
        self
    }

    pub fn with_terminal_tag(mut self, tag: impl Into<ChunkTag>) -> Self {
        self.terminal_tag = tag.into();
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }
}

/// Outcome for a single chunk, addressed by tag and position within the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkVerification {
    pub tag: ChunkTag,
    pub index: usize,
    pub offset: u64,
    pub length: u32,
    pub stored_crc: u32,
    pub computed_crc: u32,
    #[serde(skip)]
    pub result: Result<(), VerifyError>,
    pub error: Option<ErrorKind>,
}

impl ChunkVerification {
    fn new(tag: ChunkTag, index: usize, chunk: &Chunk) -> Self {
        let (computed_crc, result) = verify_record(chunk);
        Self {
            tag,
            index,
            offset: chunk.offset,
            length: chunk.length,
            stored_crc: chunk.crc,
            computed_crc,
            error: result.err().map(|e| e.kind()),
            result,
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Verifies every chunk in tag order, then stream order within each tag.
///
/// With `stop_at_terminal`, traversal ends at the first terminal chunk; it and
/// everything after it go unchecked. The parallel path produces the same list
/// in the same order.
pub fn verify_container(
    container: &DecodedContainer,
    options: &VerifyOptions,
) -> Vec<ChunkVerification> {
    let selected: Vec<(ChunkTag, usize, &Chunk)> = container
        .chunks
        .records()
        .take_while(|(tag, _, _)| !(options.stop_at_terminal && *tag == options.terminal_tag))
        .collect();

    let results: Vec<ChunkVerification> = if options.parallel {
        selected
            .par_iter()
            .map(|&(tag, index, chunk)| ChunkVerification::new(tag, index, chunk))
            .collect()
    } else {
        selected
            .iter()
            .map(|&(tag, index, chunk)| ChunkVerification::new(tag, index, chunk))
            .collect()
    };

    for entry in results.iter().filter(|e| !e.is_ok()) {
        tracing::debug!(
            tag = %entry.tag,
            index = entry.index,
            stored = entry.stored_crc,
            computed = entry.computed_crc,
            "chunk failed verification"
        );
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_chunk() {
        let chunk = Chunk::new(*b"IDAT", vec![1, 2, 3, 4]);
        let (crc, result) = verify_record(&chunk);
        assert!(result.is_ok());
        assert_eq!(crc, chunk.crc);
    }

    #[test]
    fn test_length_checked_before_crc() {
        let mut chunk = Chunk::new(*b"IDAT", vec![1, 2, 3, 4]);
        chunk.length = 8;
        chunk.crc = 0xDEADBEEF;

        let (crc, result) = verify_record(&chunk);
        assert_eq!(crc, 0);
        assert_eq!(
            result,
            Err(VerifyError::MissingBytes {
                declared: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_crc_mismatch_reports_computed() {
        let mut chunk = Chunk::new(*b"tEXt", b"comment".to_vec());
        let expected = chunk.crc;
        chunk.crc ^= 1;

        let (crc, result) = verify_record(&chunk);
        assert_eq!(crc, expected);
        assert_eq!(
            result,
            Err(VerifyError::CrcMismatch {
                stored: expected ^ 1,
                computed: expected
            })
        );
    }

    #[test]
    fn test_verification_serializes_without_result() {
        let chunk = Chunk::new(*b"IEND", Vec::new());
        let entry = ChunkVerification::new(chunk.tag, 0, &chunk);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["tag"], "IEND");
        assert!(json["error"].is_null());
        assert!(json.get("result").is_none());
    }
}
