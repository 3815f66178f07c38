use crate::error::{Error, Result};
use super::reader::BinaryReader;
use super::writer::BinaryWriter;

/// Side length of one canvas chunk, in pixels.
pub const CHUNK_SIZE: i32 = 16;
/// Decompressed size of one chunk: 16x16 RGB triples.
pub const CHUNK_BYTES: usize = (CHUNK_SIZE * CHUNK_SIZE * 3) as usize;

/// Runs shorter than this are cheaper as literals (a repeat record is 5 bytes,
/// a pixel 3).
const MIN_RUN: usize = 3;

/// One chunk's pixels, decoded to flat row-major RGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedChunk {
    pub cx: i32,
    pub cy: i32,
    pub pixels: Vec<u8>,
}

impl DecodedChunk {
    pub fn decode(cx: i32, cy: i32, payload: &[u8]) -> Result<Self> {
        Ok(Self { cx, cy, pixels: decompress_chunk(payload)? })
    }
}

/// Decompress a chunk payload.
///
/// Layout: u16le decompressed length, u16le repeat count N, N u16le repeat
/// locations (relative to the body start at `4 + 2N`), then the body. Each
/// repeat location marks a 5-byte record in the body (u16le run length + RGB
/// triple); body bytes between records are literal pixel data.
pub fn decompress_chunk(payload: &[u8]) -> Result<Vec<u8>> {
    let mut header = BinaryReader::new(payload);
    let original_length = header.read_u16_le()? as usize;
    if original_length != CHUNK_BYTES {
        return Err(Error::PayloadLength { expected: CHUNK_BYTES, actual: original_length });
    }
    let repeat_count = header.read_u16_le()? as usize;
    let offset = 4 + repeat_count * 2;
    let mut locations = Vec::with_capacity(repeat_count);
    for _ in 0..repeat_count {
        locations.push(header.read_u16_le()? as usize + offset);
    }

    let mut out = Vec::with_capacity(original_length);
    let mut cursor = offset;
    for loc in locations {
        if loc > payload.len() {
            return Err(Error::PayloadTruncated { need: loc, have: payload.len() });
        }
        if loc > cursor {
            copy_literal(&mut out, &payload[cursor..loc], original_length)?;
            cursor = loc;
        }
        let record = payload
            .get(cursor..cursor + 5)
            .ok_or(Error::PayloadTruncated { need: cursor + 5, have: payload.len() })?;
        let run = u16::from_le_bytes([record[0], record[1]]) as usize;
        let color = [record[2], record[3], record[4]];
        cursor += 5;
        if out.len() + run * 3 > original_length {
            return Err(Error::PayloadOverflow { need: out.len() + run * 3, capacity: original_length });
        }
        for _ in 0..run {
            out.extend_from_slice(&color);
        }
    }
    copy_literal(&mut out, &payload[cursor..], original_length)?;

    if out.len() != original_length {
        return Err(Error::PayloadLength { expected: original_length, actual: out.len() });
    }
    Ok(out)
}

fn copy_literal(out: &mut Vec<u8>, bytes: &[u8], capacity: usize) -> Result<()> {
    if out.len() + bytes.len() > capacity {
        return Err(Error::PayloadOverflow { need: out.len() + bytes.len(), capacity });
    }
    out.extend_from_slice(bytes);
    Ok(())
}

/// Compress flat row-major RGB pixel data into the chunk payload layout.
///
/// Maximal runs of at least `MIN_RUN` identical pixels become repeat records;
/// everything else is emitted literally. `decompress_chunk` inverts this for
/// any input.
pub fn compress_chunk(raw: &[u8]) -> Vec<u8> {
    debug_assert_eq!(raw.len() % 3, 0);
    let pixels: Vec<&[u8]> = raw.chunks_exact(3).collect();

    let mut body = BinaryWriter::new();
    let mut locations: Vec<u16> = Vec::new();
    let mut i = 0;
    while i < pixels.len() {
        let mut run = 1;
        while i + run < pixels.len() && pixels[i + run] == pixels[i] {
            run += 1;
        }
        if run >= MIN_RUN {
            locations.push(body.len() as u16);
            body.write_u16_le(run as u16);
            body.write_bytes(pixels[i]);
        } else {
            for _ in 0..run {
                body.write_bytes(pixels[i]);
            }
        }
        i += run;
    }
    let body = body.into_vec();

    let mut out = BinaryWriter::with_capacity(4 + locations.len() * 2 + body.len());
    out.write_u16_le(raw.len() as u16);
    out.write_u16_le(locations.len() as u16);
    for loc in &locations {
        out.write_u16_le(*loc);
    }
    out.write_bytes(&body);
    out.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_pixels(color: [u8; 3]) -> Vec<u8> {
        color.iter().copied().cycle().take(CHUNK_BYTES).collect()
    }

    #[test]
    fn test_decode_uniform_chunk() {
        // 768-byte chunk of (10,20,30): one repeat record at body offset 0.
        let payload = [
            0x00, 0x03, // original length = 768
            0x01, 0x00, // one repeat
            0x00, 0x00, // at body offset 0
            0x00, 0x01, // run of 256
            10, 20, 30,
        ];
        let pixels = decompress_chunk(&payload).unwrap();
        assert_eq!(pixels.len(), CHUNK_BYTES);
        assert!(pixels.chunks_exact(3).all(|p| p == [10, 20, 30]));
    }

    #[test]
    fn test_compress_uniform_matches_wire_layout() {
        let payload = compress_chunk(&uniform_pixels([10, 20, 30]));
        assert_eq!(
            payload,
            vec![0x00, 0x03, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 10, 20, 30]
        );
    }

    #[test]
    fn test_round_trip_mixed_runs_and_literals() {
        // Gradient rows (all literal) interleaved with constant rows (runs).
        let mut pixels = Vec::with_capacity(CHUNK_BYTES);
        for y in 0..CHUNK_SIZE as u8 {
            for x in 0..CHUNK_SIZE as u8 {
                if y % 2 == 0 {
                    pixels.extend_from_slice(&[x * 3, y * 7, x ^ y]);
                } else {
                    pixels.extend_from_slice(&[y, y, y]);
                }
            }
        }
        let decoded = decompress_chunk(&compress_chunk(&pixels)).unwrap();
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn test_round_trip_all_literal() {
        let mut pixels = Vec::with_capacity(CHUNK_BYTES);
        for i in 0..(CHUNK_BYTES / 3) as u16 {
            pixels.extend_from_slice(&[(i % 251) as u8, (i / 3) as u8, (i % 7) as u8]);
        }
        let payload = compress_chunk(&pixels);
        assert_eq!(decompress_chunk(&payload).unwrap(), pixels);
    }

    #[test]
    fn test_decode_rejects_wrong_original_length() {
        let payload = [0x00, 0x01, 0x00, 0x00]; // claims 256 bytes
        assert!(matches!(
            decompress_chunk(&payload),
            Err(Error::PayloadLength { expected: CHUNK_BYTES, actual: 256 })
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        assert!(matches!(
            decompress_chunk(&[0x00]),
            Err(Error::PayloadTruncated { .. })
        ));
        // Claims one repeat location but carries none.
        assert!(matches!(
            decompress_chunk(&[0x00, 0x03, 0x01, 0x00]),
            Err(Error::PayloadTruncated { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_repeat_record() {
        // Repeat record cut off after the run length.
        let payload = [0x00, 0x03, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01];
        assert!(matches!(
            decompress_chunk(&payload),
            Err(Error::PayloadTruncated { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_run_past_output() {
        // Run of 257 pixels overflows the 768-byte output.
        let payload = [0x00, 0x03, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01, 1, 2, 3];
        assert!(matches!(
            decompress_chunk(&payload),
            Err(Error::PayloadOverflow { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_short_output() {
        // Run of 255 pixels leaves the output one pixel short.
        let payload = [0x00, 0x03, 0x01, 0x00, 0x00, 0x00, 0xFF, 0x00, 1, 2, 3];
        assert!(matches!(
            decompress_chunk(&payload),
            Err(Error::PayloadLength { expected: CHUNK_BYTES, actual: 765 })
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_literal_overflow() {
        // Full run of 256, then stray trailing bytes.
        let payload = [
            0x00, 0x03, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 1, 2, 3, 0xAA, 0xBB,
        ];
        assert!(matches!(
            decompress_chunk(&payload),
            Err(Error::PayloadOverflow { .. })
        ));
    }

    #[test]
    fn test_decoded_chunk_carries_coordinates() {
        let payload = compress_chunk(&uniform_pixels([1, 2, 3]));
        let chunk = DecodedChunk::decode(-3, 7, &payload).unwrap();
        assert_eq!((chunk.cx, chunk.cy), (-3, 7));
        assert_eq!(chunk.pixels.len(), CHUNK_BYTES);
    }
}
