mod chunk;
mod decoder;
mod signature;
mod verifier;

pub use chunk::{Chunk, ChunkTag};
pub use decoder::{
    ChunkMap, ChunkStreamDecoder, DecodeOptions, DecodedContainer, PartialDecode,
    TruncationPolicy, decode, decode_with,
};
pub use signature::{
    LineFeedClass, SIGNATURE_LEN, Signature, SignatureOptions, validate_signature,
};
pub use verifier::{ChunkVerification, VerifyOptions, verify_container, verify_record};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub const IHDR: ChunkTag = ChunkTag::new(*b"IHDR");

pub const IDAT: ChunkTag = ChunkTag::new(*b"IDAT");

pub const IEND: ChunkTag = ChunkTag::new(*b"IEND");

pub const CR: u8 = 0x0D;

pub const LF: u8 = 0x0A;

/// DOS end-of-file marker, byte 6 of the signature.
pub const SUB: u8 = 0x1A;
