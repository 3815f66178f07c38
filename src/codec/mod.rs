pub mod chunk;
pub mod reader;
pub mod writer;

pub use chunk::{compress_chunk, decompress_chunk, DecodedChunk, CHUNK_BYTES, CHUNK_SIZE};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;
