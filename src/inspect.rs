//! Parse-then-verify entry point.
//!
//! Runs the signature check, the chunk decode, and per-chunk verification over
//! one stream and folds the results into a single serializable report.

use std::io::{Cursor, Read};

use serde::Serialize;

use crate::error::{DecodeError, ErrorKind, SignatureError};
use crate::png::{
    ChunkStreamDecoder, ChunkVerification, DecodeOptions, DecodedContainer, VerifyOptions,
    verify_container,
};

#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    pub decode: DecodeOptions,
    pub verify: VerifyOptions,
}

impl InspectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decode(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }

    pub fn with_verify(mut self, verify: VerifyOptions) -> Self {
        self.verify = verify;
        self
    }
}

/// A reported problem in serializable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: ErrorKind,
    pub message: String,
}

impl Issue {
    fn new(kind: ErrorKind, message: impl ToString) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Inspection {
    pub signature_len: usize,
    pub signature_issue: Option<Issue>,
    pub decode_issue: Option<Issue>,
    pub chunk_count: usize,
    pub chunks: Vec<ChunkVerification>,

    /// `None` when the stream failed before the signature could be read.
    #[serde(skip)]
    pub signature_result: Option<Result<(), SignatureError>>,
    #[serde(skip)]
    pub decode_error: Option<DecodeError>,
    #[serde(skip)]
    pub container: DecodedContainer,
}

impl Inspection {
    pub fn is_clean(&self) -> bool {
        !matches!(self.signature_result, Some(Err(_)))
            && self.decode_error.is_none()
            && self.chunks.iter().all(ChunkVerification::is_ok)
    }

    pub fn failed_chunks(&self) -> impl Iterator<Item = &ChunkVerification> {
        self.chunks.iter().filter(|c| !c.is_ok())
    }

    /// Every distinct class of damage found, in detection order.
    pub fn error_kinds(&self) -> Vec<ErrorKind> {
        let mut kinds = Vec::new();
        let found = self
            .signature_issue
            .iter()
            .chain(self.decode_issue.iter())
            .map(|issue| issue.kind)
            .chain(self.chunks.iter().filter_map(|c| c.error));
        for kind in found {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }
}

/// Inspects a stream. Faults are recorded in the report, never returned, so
/// chunks decoded before a fault are still verified.
pub fn inspect<R: Read>(reader: R, options: &InspectOptions) -> Inspection {
    let partial = ChunkStreamDecoder::new(reader, options.decode.clone()).decode_partial();
    let container = partial.container;

    let signature_result = partial
        .signature_collected
        .then(|| container.signature.verify());
    let chunks = verify_container(&container, &options.verify);

    Inspection {
        signature_len: container.signature.len(),
        signature_issue: match &signature_result {
            Some(Err(e)) => Some(Issue::new(e.kind(), e)),
            _ => None,
        },
        decode_issue: partial.error.as_ref().map(|e| Issue::new(e.kind(), e)),
        chunk_count: container.chunks.len(),
        chunks,
        signature_result,
        decode_error: partial.error,
        container,
    }
}

pub fn inspect_bytes(data: &[u8], options: &InspectOptions) -> Inspection {
    inspect(Cursor::new(data), options)
}
