//! Our World of Pixels canvas download client
//!
//! A Rust library for downloading rectangular regions of an Our World of
//! Pixels canvas over its binary WebSocket protocol and assembling them into
//! PNG images, with resume support for interrupted downloads.

pub mod canvas;
pub mod client;
pub mod codec;
pub mod error;
pub mod protocol;

pub use canvas::{
    CanvasRegion, ChunkGrid, CoverageMap, DirectoryStore, ImageStore, MemoryStore, Raster,
    TILE_SIZE,
};
pub use client::{DownloadConfig, Downloader, ResumeScan, DEFAULT_HOST};
pub use codec::{compress_chunk, decompress_chunk, DecodedChunk, CHUNK_BYTES, CHUNK_SIZE};
pub use error::{Error, Result};
pub use protocol::{FrameHandler, Session, SessionConfig, SessionState};
