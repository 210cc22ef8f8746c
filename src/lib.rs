pub mod cli;
pub mod error;
pub mod inspect;
pub mod png;

pub use error::{DecodeError, ErrorKind, RecordField, SignatureError, VerifyError};
pub use inspect::{InspectOptions, Inspection, Issue, inspect, inspect_bytes};
pub use png::{
    Chunk, ChunkMap, ChunkStreamDecoder, ChunkTag, ChunkVerification, DecodeOptions,
    DecodedContainer, LineFeedClass, PartialDecode, Signature, SignatureOptions,
    TruncationPolicy, VerifyOptions, decode, decode_with, validate_signature, verify_container,
    verify_record,
};
