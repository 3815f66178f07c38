#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid region: ({px0},{py0}) to ({px1},{py1})")]
    InvalidRegion { px0: i32, py0: i32, px1: i32, py1: i32 },

    #[error("chunk payload truncated: need {need} bytes, have {have}")]
    PayloadTruncated { need: usize, have: usize },

    #[error("chunk payload overflows output: need {need} bytes, capacity {capacity}")]
    PayloadOverflow { need: usize, capacity: usize },

    #[error("chunk payload length mismatch: expected {expected} bytes, decoded {actual}")]
    PayloadLength { expected: usize, actual: usize },

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("not joined to canvas")]
    NotJoined,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
