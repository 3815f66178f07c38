pub mod frame;
pub mod session;

pub use frame::{
    chunk_data_frame, chunk_request, is_server_hello, join_frame, parse_chunk_frame, ChunkFrame,
    CHUNK_DATA_TAG, JOIN_TRAILER, SERVER_HELLO,
};
pub use session::{FrameHandler, Session, SessionConfig, SessionState};
