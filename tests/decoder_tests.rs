use std::io::{self, Cursor, Read};

use proptest::prelude::*;

use pngverify::png::{IDAT, IEND, IHDR, PNG_SIGNATURE};
use pngverify::{
    Chunk, ChunkStreamDecoder, ChunkTag, DecodeError, DecodeOptions, RecordField, decode,
};

fn make_png(chunks: &[Chunk]) -> Vec<u8> {
    let mut data = PNG_SIGNATURE.to_vec();
    for chunk in chunks {
        data.extend(chunk.to_bytes());
    }
    data
}

fn standard_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new(IHDR, vec![0, 0, 0, 16, 0, 0, 0, 16, 8, 2, 0, 0, 0]),
        Chunk::new(*b"tEXt", b"Comment\0hello".to_vec()),
        Chunk::new(IDAT, vec![0xAA; 100]),
        Chunk::new(IDAT, vec![0xBB; 50]),
        Chunk::new(IEND, Vec::new()),
    ]
}

/// Reader that yields its data, then fails.
struct FailingReader {
    data: Cursor<Vec<u8>>,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "device went away")),
            n => Ok(n),
        }
    }
}

#[test]
fn test_repeated_tag_keeps_file_order() {
    let data = make_png(&standard_chunks());
    let container = decode(Cursor::new(data)).unwrap();

    let idats = container.chunks.get(IDAT).unwrap();
    assert_eq!(idats.len(), 2);
    assert_eq!(idats[0].payload, vec![0xAA; 100]);
    assert_eq!(idats[1].payload, vec![0xBB; 50]);
    assert!(idats[0].offset < idats[1].offset);
}

#[test]
fn test_tags_iterate_in_first_appearance_order() {
    let chunks = vec![
        Chunk::new(IHDR, vec![0; 13]),
        Chunk::new(IDAT, vec![1]),
        Chunk::new(*b"tEXt", vec![2]),
        Chunk::new(IDAT, vec![3]),
    ];
    let container = decode(Cursor::new(make_png(&chunks))).unwrap();

    let tags: Vec<ChunkTag> = container.chunks.tags().collect();
    assert_eq!(tags, vec![IHDR, IDAT, ChunkTag::new(*b"tEXt")]);
    assert_eq!(container.chunks.tag_count(), 3);
    assert_eq!(container.chunks.len(), 4);

    let order: Vec<(ChunkTag, usize)> = container
        .chunks
        .records()
        .map(|(tag, index, _)| (tag, index))
        .collect();
    assert_eq!(
        order,
        vec![
            (IHDR, 0),
            (IDAT, 0),
            (IDAT, 1),
            (ChunkTag::new(*b"tEXt"), 0)
        ]
    );
}

#[test]
fn test_stream_ending_after_length_field_is_success() {
    let mut data = make_png(&[Chunk::new(IHDR, vec![0; 13])]);
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x0C]);

    let container = decode(Cursor::new(data)).unwrap();
    assert_eq!(container.chunks.len(), 1);
    assert!(container.chunks.contains(IHDR));
}

#[test]
fn test_signature_only_stream_has_no_chunks() {
    let container = decode(Cursor::new(PNG_SIGNATURE.to_vec())).unwrap();
    assert!(container.chunks.is_empty());
}

#[test]
fn test_empty_stream_decodes_to_empty_container() {
    let container = decode(Cursor::new(Vec::new())).unwrap();
    assert!(container.signature.is_empty());
    assert!(container.chunks.is_empty());
}

#[test]
fn test_truncated_payload_is_rejected() {
    let mut data = make_png(&[Chunk::new(IHDR, vec![0; 13])]);
    let idat = Chunk::new(IDAT, vec![0xCC; 64]).to_bytes();
    data.extend_from_slice(&idat[..30]);

    let err = decode(Cursor::new(data)).unwrap_err();
    match err {
        DecodeError::TruncatedRecord {
            tag,
            field,
            expected,
            available,
            offset,
        } => {
            assert_eq!(tag, Some(IDAT));
            assert_eq!(field, RecordField::Payload);
            assert_eq!(expected, 64);
            assert_eq!(available, 22);
            assert_eq!(offset, 8 + 25);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_partial_decode_keeps_earlier_chunks() {
    let mut data = make_png(&standard_chunks()[..3]);
    let idat = Chunk::new(IDAT, vec![0xCC; 64]).to_bytes();
    data.extend_from_slice(&idat[..30]);

    let partial =
        ChunkStreamDecoder::new(Cursor::new(data), DecodeOptions::default()).decode_partial();

    assert!(!partial.is_complete());
    assert_eq!(partial.container.chunks.len(), 3);
    assert_eq!(partial.container.chunks.get(IDAT).unwrap().len(), 1);
    assert!(matches!(
        partial.error,
        Some(DecodeError::TruncatedRecord { .. })
    ));
}

#[test]
fn test_io_error_is_propagated() {
    let reader = FailingReader {
        data: Cursor::new(make_png(&[Chunk::new(IHDR, vec![0; 13])])),
    };

    let partial = ChunkStreamDecoder::new(reader, DecodeOptions::default()).decode_partial();
    assert_eq!(partial.container.chunks.len(), 1);
    match partial.into_result() {
        Err(DecodeError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("expected I/O error, got {other:?}"),
    }
}

#[test]
fn test_decoder_borrows_the_stream() {
    let data = make_png(&standard_chunks());
    let mut cursor = Cursor::new(data.clone());

    let container = decode(&mut cursor).unwrap();
    assert_eq!(container.chunks.len(), 5);
    assert_eq!(cursor.position(), data.len() as u64);
}

#[test]
fn test_non_ascii_tag_is_kept_raw() {
    let chunk = Chunk::new([0xFF, 0x00, b'x', b'y'], vec![9, 9]);
    let container = decode(Cursor::new(make_png(&[chunk]))).unwrap();

    let tag = container.chunks.tags().next().unwrap();
    assert_eq!(tag.as_bytes(), &[0xFF, 0x00, b'x', b'y']);
    assert_eq!(tag.to_string(), "\\xff\\x00xy");
}

fn arb_chunk() -> impl Strategy<Value = Chunk> {
    (
        prop::sample::select(vec![*b"IHDR", *b"IDAT", *b"tEXt", *b"zTXt", *b"pHYs"]),
        prop::collection::vec(any::<u8>(), 0..64),
    )
        .prop_map(|(tag, payload)| Chunk::new(tag, payload))
}

proptest! {
    #[test]
    fn decode_is_idempotent(chunks in prop::collection::vec(arb_chunk(), 0..12)) {
        let data = make_png(&chunks);
        let first = decode(Cursor::new(data.clone())).unwrap();
        let second = decode(Cursor::new(data)).unwrap();

        let a: Vec<_> = first.chunks.records().collect();
        let b: Vec<_> = second.chunks.records().collect();
        prop_assert_eq!(a, b);
        prop_assert_eq!(first.signature, second.signature);
    }

    #[test]
    fn decode_recovers_every_chunk(chunks in prop::collection::vec(arb_chunk(), 0..12)) {
        let container = decode(Cursor::new(make_png(&chunks))).unwrap();
        prop_assert_eq!(container.chunks.len(), chunks.len());

        for (tag, _, decoded) in container.chunks.records() {
            let expected: Vec<&Chunk> = chunks.iter().filter(|c| c.tag == tag).collect();
            prop_assert!(expected.iter().any(|c| c.payload == decoded.payload && c.crc == decoded.crc));
        }
    }

    #[test]
    fn decode_never_panics_on_garbage(tail in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend(tail);
        let _ = decode(Cursor::new(data));
    }
}
