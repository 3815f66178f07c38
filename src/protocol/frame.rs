use crate::codec::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result};

/// First message the server sends once the socket is open.
pub const SERVER_HELLO: [u8; 2] = [0x05, 0x03];
/// Trailer appended to the canvas name in the join frame.
pub const JOIN_TRAILER: [u8; 2] = [0xDD, 0x63];
/// Leading tag of a chunk-data frame.
pub const CHUNK_DATA_TAG: u8 = 0x02;

/// Byte offset of the codec payload inside a chunk-data frame:
/// tag, cx i32le, cy i32le, one reserved byte.
const CHUNK_FRAME_HEADER: usize = 10;

pub fn is_server_hello(frame: &[u8]) -> bool {
    frame == SERVER_HELLO
}

/// Join frame: raw canvas-name bytes plus the fixed trailer.
pub fn join_frame(canvas: &str) -> Vec<u8> {
    let mut writer = BinaryWriter::with_capacity(canvas.len() + JOIN_TRAILER.len());
    writer.write_bytes(canvas.as_bytes());
    writer.write_bytes(&JOIN_TRAILER);
    writer.into_vec()
}

/// Chunk request: absolute chunk coordinates as two i32le values.
pub fn chunk_request(cx: i32, cy: i32) -> Vec<u8> {
    let mut writer = BinaryWriter::with_capacity(8);
    writer.write_i32_le(cx);
    writer.write_i32_le(cy);
    writer.into_vec()
}

/// A parsed chunk-data frame; the payload borrows from the frame and still
/// needs `decompress_chunk`.
#[derive(Debug, PartialEq, Eq)]
pub struct ChunkFrame<'a> {
    pub cx: i32,
    pub cy: i32,
    pub payload: &'a [u8],
}

/// Parse an inbound binary frame. Returns `Ok(None)` for frames that are not
/// chunk data (any other leading tag); a chunk-data frame too short to carry
/// its header is an error.
pub fn parse_chunk_frame(frame: &[u8]) -> Result<Option<ChunkFrame<'_>>> {
    match frame.first() {
        Some(&CHUNK_DATA_TAG) => {}
        _ => return Ok(None),
    }
    if frame.len() < CHUNK_FRAME_HEADER {
        return Err(Error::InvalidFrame(format!(
            "chunk data frame too short: {} bytes",
            frame.len()
        )));
    }
    let mut reader = BinaryReader::new(&frame[1..]);
    let cx = reader.read_i32_le()?;
    let cy = reader.read_i32_le()?;
    reader.skip(1)?; // reserved
    Ok(Some(ChunkFrame { cx, cy, payload: reader.read_remaining() }))
}

/// Build a chunk-data frame around an already-compressed payload.
pub fn chunk_data_frame(cx: i32, cy: i32, payload: &[u8]) -> Vec<u8> {
    let mut writer = BinaryWriter::with_capacity(CHUNK_FRAME_HEADER + payload.len());
    writer.write_u8(CHUNK_DATA_TAG);
    writer.write_i32_le(cx);
    writer.write_i32_le(cy);
    writer.write_u8(0);
    writer.write_bytes(payload);
    writer.into_vec()
}
